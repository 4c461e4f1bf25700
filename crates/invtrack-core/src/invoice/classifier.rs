//! Invoice type classification.
//!
//! Rules are evaluated top to bottom and the first match wins. The order is
//! part of the behavior: professional services are recognized before the
//! managed services and maintenance rules, and several rules exclude terms an
//! earlier rule already claims.

use rust_decimal::Decimal;
use tracing::trace;

use super::rules::NO_SERVICES;
use crate::models::invoice::InvoiceType;

/// What a rule inspects.
#[derive(Debug, Clone)]
pub struct ClassifierInput {
    /// Lowercased services text.
    pub text: String,
    pub amount: Decimal,
}

impl ClassifierInput {
    pub fn new(services: &str, amount: Decimal) -> Self {
        Self {
            text: services.trim().to_lowercase(),
            amount,
        }
    }

    fn has_text(&self) -> bool {
        !self.text.is_empty() && self.text != NO_SERVICES.to_lowercase()
    }

    fn has_any(&self, terms: &[&str]) -> bool {
        terms.iter().any(|t| self.text.contains(t))
    }
}

/// One classification rule.
pub struct ClassifierRule {
    pub name: &'static str,
    pub applies: fn(&ClassifierInput) -> bool,
    pub result: InvoiceType,
}

const PROFESSIONAL_TERMS: &[&str] = &[
    "consulting", "consultancy", "professional service", "penetration test", "pen test",
    "implementation services", "training", "workshop", "advisory",
];
const MANAGED_TERMS: &[&str] = &["managed service", "managed security", "managed support"];
const MAINTENANCE_TERMS: &[&str] = &["maintenance", "support", "software assurance"];
const MAINTENANCE_EXCLUSIONS: &[&str] = &["managed", "professional", "subscription"];
const LICENSE_TERMS: &[&str] = &["license", "licence"];
const RECURRING_TERMS: &[&str] = &["subscription", "annual", "yearly", "recurring"];
const SUBSCRIPTION_TERMS: &[&str] = &[
    "subscription", "annual license", "annual licence", "yearly license", "yearly licence",
    "saas", "renewal",
];
const HOSTING_TERMS: &[&str] = &[
    "hosting", "cloud", "infrastructure", "data centre", "data center", "colocation",
];
const SOFTWARE_TERMS: &[&str] = &["software"];
const HARDWARE_TERMS: &[&str] = &["hardware", "server", "appliance", "laptop"];
const THIRD_PARTY_TERMS: &[&str] = &["third party", "third-party"];

/// Classification rules in evaluation order.
pub const RULES: &[ClassifierRule] = &[
    ClassifierRule {
        name: "negative amount",
        applies: |i| i.amount < Decimal::ZERO,
        result: InvoiceType::CreditMemo,
    },
    ClassifierRule {
        name: "no services text",
        applies: |i| !i.has_text(),
        result: InvoiceType::Ps,
    },
    ClassifierRule {
        name: "credit wording",
        applies: |i| i.has_any(&["credit", "negative"]),
        result: InvoiceType::CreditMemo,
    },
    ClassifierRule {
        name: "professional services",
        applies: |i| i.has_any(PROFESSIONAL_TERMS),
        result: InvoiceType::Ps,
    },
    ClassifierRule {
        name: "managed services",
        applies: |i| {
            i.has_any(MANAGED_TERMS) || (i.text.contains("subscription") && i.text.contains("managed"))
        },
        result: InvoiceType::Ms,
    },
    ClassifierRule {
        name: "maintenance",
        applies: |i| i.has_any(MAINTENANCE_TERMS) && !i.has_any(MAINTENANCE_EXCLUSIONS),
        result: InvoiceType::Maint,
    },
    ClassifierRule {
        name: "one-off license",
        applies: |i| i.has_any(LICENSE_TERMS) && !i.has_any(RECURRING_TERMS),
        result: InvoiceType::Sw,
    },
    ClassifierRule {
        name: "subscription",
        applies: |i| i.has_any(SUBSCRIPTION_TERMS),
        result: InvoiceType::Sub,
    },
    ClassifierRule {
        name: "hosting",
        applies: |i| i.has_any(HOSTING_TERMS),
        result: InvoiceType::Hosting,
    },
    ClassifierRule {
        name: "software",
        applies: |i| i.has_any(SOFTWARE_TERMS),
        result: InvoiceType::Sw,
    },
    ClassifierRule {
        name: "hardware",
        applies: |i| i.has_any(HARDWARE_TERMS),
        result: InvoiceType::Hw,
    },
    ClassifierRule {
        name: "third party",
        applies: |i| i.has_any(THIRD_PARTY_TERMS),
        result: InvoiceType::ThirdParty,
    },
];

/// Classify an invoice from its services text and amount. Defaults to PS.
pub fn classify(services: &str, invoice_number: &str, amount: Decimal) -> InvoiceType {
    let input = ClassifierInput::new(services, amount);
    match RULES.iter().find(|rule| (rule.applies)(&input)) {
        Some(rule) => {
            trace!(invoice_number, rule = rule.name, result = %rule.result, "classified invoice");
            rule.result
        }
        None => {
            trace!(invoice_number, "no classification rule matched, defaulting to PS");
            InvoiceType::Ps
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_text(text: &str) -> InvoiceType {
        classify(text, "X", Decimal::new(100, 0))
    }

    #[test]
    fn test_professional_services_before_managed() {
        assert_eq!(classify_text("Professional Services - Managed Support"), InvoiceType::Ps);
    }

    #[test]
    fn test_negative_amount_is_credit_memo() {
        for text in ["Managed SOC", "", "Hardware refresh"] {
            assert_eq!(classify(text, "X", Decimal::new(-50, 0)), InvoiceType::CreditMemo);
        }
    }

    #[test]
    fn test_empty_text_defaults_to_ps() {
        assert_eq!(classify_text(""), InvoiceType::Ps);
        assert_eq!(classify_text(NO_SERVICES), InvoiceType::Ps);
    }

    #[test]
    fn test_credit_wording() {
        assert_eq!(classify_text("Credit for unused hours"), InvoiceType::CreditMemo);
    }

    #[test]
    fn test_managed_rules() {
        assert_eq!(classify_text("Managed Security Monthly"), InvoiceType::Ms);
        assert_eq!(classify_text("Managed SIEM subscription"), InvoiceType::Ms);
    }

    #[test]
    fn test_maintenance_guard() {
        assert_eq!(classify_text("Annual maintenance and support"), InvoiceType::Maint);
        // support alongside subscription is not maintenance
        assert_eq!(classify_text("Support subscription"), InvoiceType::Sub);
    }

    #[test]
    fn test_license_vs_subscription() {
        assert_eq!(classify_text("Perpetual license x5"), InvoiceType::Sw);
        assert_eq!(classify_text("Annual License Renewal"), InvoiceType::Sub);
        assert_eq!(classify_text("Semi-Annual License Fee"), InvoiceType::Sub);
    }

    #[test]
    fn test_remaining_categories() {
        assert_eq!(classify_text("Cloud hosting"), InvoiceType::Hosting);
        assert_eq!(classify_text("Software purchase"), InvoiceType::Sw);
        assert_eq!(classify_text("Firewall appliance"), InvoiceType::Hw);
        assert_eq!(classify_text("Third party pass-through"), InvoiceType::ThirdParty);
        assert_eq!(classify_text("Miscellaneous"), InvoiceType::Ps);
    }
}
