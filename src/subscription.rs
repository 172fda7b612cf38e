use crate::models::{Plan, UserProfile};

impl Plan {
    pub const ALL: [Plan; 3] = [Plan::Starter, Plan::Pro, Plan::Executive];

    pub fn price_label(&self) -> &'static str {
        match self {
            Plan::Starter => "$9/month",
            Plan::Pro => "$29/month",
            Plan::Executive => "$99/month",
        }
    }

    pub fn parse(s: &str) -> Option<Plan> {
        match s.trim().to_lowercase().as_str() {
            "starter" => Some(Plan::Starter),
            "pro" => Some(Plan::Pro),
            "executive" | "exec" => Some(Plan::Executive),
            _ => None,
        }
    }
}

/// No payment is taken; subscribing only unlocks the gated views.
pub fn subscribe(profile: &UserProfile, plan: Plan) -> UserProfile {
    let mut next = profile.clone();
    next.is_subscribed = true;
    next.subscription_plan = Some(plan);
    next
}

pub fn cancel(profile: &UserProfile) -> UserProfile {
    let mut next = profile.clone();
    next.is_subscribed = false;
    next.subscription_plan = None;
    next
}
