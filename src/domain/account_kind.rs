use serde::{Deserialize, Serialize};

// Who a logged in identity is, resolved once at login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind{
    Customer,
    RestaurantOwner,
    Superuser
}

impl AccountKind {
    pub fn resolve(is_superuser: bool, has_restaurant_account: bool) -> Self{
        if is_superuser {
            AccountKind::Superuser
        } else if has_restaurant_account {
            AccountKind::RestaurantOwner
        } else {
            AccountKind::Customer
        }
    }

    pub fn as_str(&self) -> &'static str{
        match self {
            AccountKind::Customer => "customer",
            AccountKind::RestaurantOwner => "restaurant_owner",
            AccountKind::Superuser => "superuser"
        }
    }

    pub fn parse(value: &str) -> Option<Self>{
        match value {
            "customer" => Some(AccountKind::Customer),
            "restaurant_owner" => Some(AccountKind::RestaurantOwner),
            "superuser" => Some(AccountKind::Superuser),
            _ => None
        }
    }
}
