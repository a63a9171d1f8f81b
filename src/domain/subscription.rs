use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType{
    Restaurant,
    User
}

impl PlanType {
    pub fn as_str(&self) -> &'static str{
        match self {
            PlanType::Restaurant => "restaurant",
            PlanType::User => "user"
        }
    }

    pub fn parse(value: &str) -> Option<Self>{
        match value {
            "restaurant" => Some(PlanType::Restaurant),
            "user" => Some(PlanType::User),
            _ => None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle{
    #[default]
    Monthly,
    Yearly
}

impl BillingCycle {
    pub fn period(&self) -> Duration{
        match self {
            BillingCycle::Monthly => Duration::days(30),
            BillingCycle::Yearly => Duration::days(365)
        }
    }

    pub fn label(&self) -> &'static str{
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Yearly => "yearly"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus{
    Active,
    Canceled,
    Expired,
    Trial
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str{
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Trial => "trial"
        }
    }

    pub fn parse(value: &str) -> Option<Self>{
        match value {
            "active" => Some(SubscriptionStatus::Active),
            "canceled" => Some(SubscriptionStatus::Canceled),
            "expired" => Some(SubscriptionStatus::Expired),
            "trial" => Some(SubscriptionStatus::Trial),
            _ => None
        }
    }
}

// Who a subscription belongs to: a customer or a restaurant account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionHolder{
    User(uuid::Uuid),
    Restaurant(uuid::Uuid)
}

impl SubscriptionHolder {
    pub fn plan_type(&self) -> PlanType{
        match self {
            SubscriptionHolder::User(_) => PlanType::User,
            SubscriptionHolder::Restaurant(_) => PlanType::Restaurant
        }
    }
}

pub fn end_date(start: NaiveDate, cycle: BillingCycle) -> NaiveDate{
    start + cycle.period()
}

pub fn price_for(cycle: BillingCycle, monthly: i32, yearly: i32) -> i32{
    match cycle {
        BillingCycle::Monthly => monthly,
        BillingCycle::Yearly => yearly
    }
}

pub fn is_active(status: SubscriptionStatus, end: NaiveDate, today: NaiveDate) -> bool{
    status == SubscriptionStatus::Active && end >= today
}

pub fn days_remaining(end: NaiveDate, today: NaiveDate) -> i64{
    (end - today).num_days().max(0)
}
