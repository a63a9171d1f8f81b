use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestaurantStatus{
    Pending,
    Approved,
    Sanctioned,
    Banned,
    Rejected
}

impl RestaurantStatus {
    pub fn as_str(&self) -> &'static str{
        match self {
            RestaurantStatus::Pending => "pending",
            RestaurantStatus::Approved => "approved",
            RestaurantStatus::Sanctioned => "sanctioned",
            RestaurantStatus::Banned => "banned",
            RestaurantStatus::Rejected => "rejected"
        }
    }

    pub fn parse(value: &str) -> Option<Self>{
        match value {
            "pending" => Some(RestaurantStatus::Pending),
            "approved" => Some(RestaurantStatus::Approved),
            "sanctioned" => Some(RestaurantStatus::Sanctioned),
            "banned" => Some(RestaurantStatus::Banned),
            "rejected" => Some(RestaurantStatus::Rejected),
            _ => None
        }
    }
}

/// Which reason column a transition writes its reason into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonField{
    Rejection,
    Sanction,
    Ban
}

/// Everything a status change does to the account and its restaurant.
///
/// `restaurant_open` is `None` when the restaurant's open flag is left
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEffects{
    pub is_active: bool,
    pub pending_approval: bool,
    pub restaurant_open: Option<bool>,
    pub reason_field: Option<ReasonField>
}

impl StatusEffects {
    pub fn of(status: RestaurantStatus) -> Self{
        match status {
            RestaurantStatus::Approved => StatusEffects{
                is_active: true,
                pending_approval: false,
                restaurant_open: Some(true),
                reason_field: None
            },
            RestaurantStatus::Sanctioned => StatusEffects{
                is_active: true,
                pending_approval: false,
                restaurant_open: Some(false),
                reason_field: Some(ReasonField::Sanction)
            },
            RestaurantStatus::Banned => StatusEffects{
                is_active: false,
                pending_approval: false,
                restaurant_open: Some(false),
                reason_field: Some(ReasonField::Ban)
            },
            RestaurantStatus::Rejected => StatusEffects{
                is_active: false,
                pending_approval: false,
                restaurant_open: None,
                reason_field: Some(ReasonField::Rejection)
            },
            RestaurantStatus::Pending => StatusEffects{
                is_active: false,
                pending_approval: true,
                restaurant_open: None,
                reason_field: None
            }
        }
    }
}

/// Subject and body of the email sent to the account holder after a
/// status change.
pub fn notification_for(
    status: RestaurantStatus,
    restaurant_name: &str,
    reason: Option<&str>
) -> (String, String){
    let reason = reason.unwrap_or("No reason given");

    match status {
        RestaurantStatus::Approved => (
            "Your restaurant has been approved".to_string(),
            format!("Good news! {} is now approved and visible on FoodFlex.", restaurant_name)
        ),
        RestaurantStatus::Sanctioned => (
            "Your restaurant has been sanctioned".to_string(),
            format!("{} has been sanctioned and is closed until further notice. Reason: {}", restaurant_name, reason)
        ),
        RestaurantStatus::Banned => (
            "Your restaurant has been banned".to_string(),
            format!("{} has been banned from FoodFlex. Reason: {}", restaurant_name, reason)
        ),
        RestaurantStatus::Rejected => (
            "Your restaurant application was rejected".to_string(),
            format!("The application for {} was rejected. Reason: {}", restaurant_name, reason)
        ),
        RestaurantStatus::Pending => (
            "Your restaurant is under review".to_string(),
            format!("{} is waiting for review by the FoodFlex team.", restaurant_name)
        )
    }
}
