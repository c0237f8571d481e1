//! Eligibility checks
//!
//! Each check is a pure threshold decision over a small fixed input tuple.
//! The decision string and the inputs are handed to the log store as one
//! opaque record; nothing here touches storage.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use crate::storage::EligibilityLog;

/// Service a log record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Visa,
    Loan,
    CreditCard,
    Insurance,
    GovernmentScheme,
    FormFiller,
}

impl ServiceType {
    /// Wire name stored in the log table
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Visa => "visa",
            ServiceType::Loan => "loan",
            ServiceType::CreditCard => "credit_card",
            ServiceType::Insurance => "insurance",
            ServiceType::GovernmentScheme => "government_scheme",
            ServiceType::FormFiller => "form_filler",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "visa" => Some(ServiceType::Visa),
            "loan" => Some(ServiceType::Loan),
            "credit_card" => Some(ServiceType::CreditCard),
            "insurance" => Some(ServiceType::Insurance),
            "government_scheme" => Some(ServiceType::GovernmentScheme),
            "form_filler" => Some(ServiceType::FormFiller),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A stateless eligibility decision
pub trait EligibilityCheck {
    /// Service this check belongs to
    fn service_type(&self) -> ServiceType;

    /// Inputs as recorded in the log
    fn input_data(&self) -> Value;

    /// Decision string shown to the user
    fn evaluate(&self) -> String;

    /// Evaluate and package the outcome as a log record
    fn to_log(&self, user_id: &str) -> EligibilityLog {
        EligibilityLog {
            user_id: user_id.to_string(),
            service_type: self.service_type(),
            input_data: self.input_data(),
            result: self.evaluate(),
        }
    }
}

const VISA_MIN_INCOME: f64 = 50_000.0;
const LOAN_MIN_INCOME: f64 = 30_000.0;
const LOAN_MIN_CREDIT_SCORE: i64 = 700;
const CARD_MIN_SALARY: f64 = 40_000.0;
const CARD_MAX_EXISTING: u32 = 2;
const CLAIM_AUTO_APPROVAL_LIMIT: f64 = 200_000.0;
const SENIOR_CITIZEN_AGE: u32 = 60;

/// Visa application check
#[derive(Debug, Clone)]
pub struct VisaCheck {
    pub country: String,
    /// Monthly income in rupees
    pub income: f64,
}

impl EligibilityCheck for VisaCheck {
    fn service_type(&self) -> ServiceType {
        ServiceType::Visa
    }

    fn input_data(&self) -> Value {
        json!({ "country": self.country, "income": self.income })
    }

    fn evaluate(&self) -> String {
        if self.country == "India" {
            "Eligible - Indian citizens are always eligible".to_string()
        } else if self.income >= VISA_MIN_INCOME {
            format!(
                "Eligible - Income meets requirement (₹{})",
                format_amount(self.income)
            )
        } else {
            "Not Eligible - Income below minimum (₹50,000 required)".to_string()
        }
    }
}

/// Bank loan check
#[derive(Debug, Clone)]
pub struct LoanCheck {
    /// Monthly income in rupees
    pub income: f64,
    pub credit_score: i64,
}

impl EligibilityCheck for LoanCheck {
    fn service_type(&self) -> ServiceType {
        ServiceType::Loan
    }

    fn input_data(&self) -> Value {
        json!({ "income": self.income, "credit_score": self.credit_score })
    }

    fn evaluate(&self) -> String {
        if self.income >= LOAN_MIN_INCOME && self.credit_score >= LOAN_MIN_CREDIT_SCORE {
            format!(
                "Eligible - Income: ₹{}, Credit Score: {}",
                format_amount(self.income),
                self.credit_score
            )
        } else if self.income < LOAN_MIN_INCOME {
            "Not Eligible - Income below minimum (₹30,000 required)".to_string()
        } else {
            "Not Eligible - Credit score below minimum (700 required)".to_string()
        }
    }
}

/// Credit card check
#[derive(Debug, Clone)]
pub struct CreditCardCheck {
    /// Monthly salary in rupees
    pub salary: f64,
    pub existing_cards: u32,
}

impl EligibilityCheck for CreditCardCheck {
    fn service_type(&self) -> ServiceType {
        ServiceType::CreditCard
    }

    fn input_data(&self) -> Value {
        json!({ "salary": self.salary, "existing_cards": self.existing_cards })
    }

    fn evaluate(&self) -> String {
        if self.salary >= CARD_MIN_SALARY && self.existing_cards <= CARD_MAX_EXISTING {
            format!(
                "Eligible - Salary: ₹{}, Existing Cards: {}",
                format_amount(self.salary),
                self.existing_cards
            )
        } else if self.salary < CARD_MIN_SALARY {
            "Not Eligible - Salary below minimum (₹40,000 required)".to_string()
        } else {
            "Not Eligible - Too many existing cards (maximum 2 allowed)".to_string()
        }
    }
}

/// Insurance claim check
#[derive(Debug, Clone)]
pub struct InsuranceClaim {
    pub claim_amount: f64,
}

impl EligibilityCheck for InsuranceClaim {
    fn service_type(&self) -> ServiceType {
        ServiceType::Insurance
    }

    fn input_data(&self) -> Value {
        json!({ "claim_amount": self.claim_amount })
    }

    fn evaluate(&self) -> String {
        if self.claim_amount <= CLAIM_AUTO_APPROVAL_LIMIT {
            format!("Claim Approved - Amount: ₹{}", format_amount(self.claim_amount))
        } else {
            "Claim Under Review - Amount exceeds automatic approval limit (₹2,00,000)".to_string()
        }
    }
}

/// Reservation category used by the scheme check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CasteCategory {
    General,
    #[serde(rename = "OBC")]
    Obc,
    #[serde(rename = "SC/ST")]
    ScSt,
}

impl CasteCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CasteCategory::General => "General",
            CasteCategory::Obc => "OBC",
            CasteCategory::ScSt => "SC/ST",
        }
    }
}

impl FromStr for CasteCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(CasteCategory::General),
            "obc" => Ok(CasteCategory::Obc),
            "sc/st" | "sc" | "st" | "scst" => Ok(CasteCategory::ScSt),
            other => Err(format!("unknown category '{}' (expected General, OBC or SC/ST)", other)),
        }
    }
}

/// Government scheme check
#[derive(Debug, Clone)]
pub struct SchemeCheck {
    pub caste: CasteCategory,
    /// Annual income in rupees
    pub annual_income: f64,
    pub age: u32,
}

impl SchemeCheck {
    /// Names of every scheme the applicant qualifies for
    pub fn eligible_schemes(&self) -> Vec<&'static str> {
        let mut schemes = Vec::new();

        let income_ok = match self.caste {
            CasteCategory::ScSt => self.annual_income <= 300_000.0,
            CasteCategory::Obc => self.annual_income <= 500_000.0,
            CasteCategory::General => self.annual_income <= 250_000.0,
        };
        if income_ok {
            schemes.push(match self.caste {
                CasteCategory::ScSt => "SC Development Grant",
                CasteCategory::Obc => "OBC Scholarship Scheme",
                CasteCategory::General => "General Merit Benefit",
            });
        }

        if self.age >= SENIOR_CITIZEN_AGE {
            schemes.push("Senior Citizen Pension Scheme");
        }

        schemes
    }
}

impl EligibilityCheck for SchemeCheck {
    fn service_type(&self) -> ServiceType {
        ServiceType::GovernmentScheme
    }

    fn input_data(&self) -> Value {
        json!({
            "caste": self.caste.as_str(),
            "annual_income": self.annual_income,
            "age": self.age,
        })
    }

    fn evaluate(&self) -> String {
        let schemes = self.eligible_schemes();
        if schemes.is_empty() {
            "No schemes available based on your criteria".to_string()
        } else {
            schemes.join(", ")
        }
    }
}

/// Format a rupee amount with comma thousands separators.
///
/// Whole numbers print without decimals; fractions keep up to two digits.
pub fn format_amount(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let fraction = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    if fraction == 0 {
        format!("{}{}", sign, grouped)
    } else {
        let fraction = format!("{:02}", fraction);
        format!("{}{}.{}", sign, grouped, fraction.trim_end_matches('0'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_card_thresholds() {
        let eligible = CreditCardCheck { salary: 40_000.0, existing_cards: 2 };
        assert_eq!(eligible.evaluate(), "Eligible - Salary: ₹40,000, Existing Cards: 2");

        let low_salary = CreditCardCheck { salary: 39_999.0, existing_cards: 0 };
        assert_eq!(
            low_salary.evaluate(),
            "Not Eligible - Salary below minimum (₹40,000 required)"
        );

        let too_many = CreditCardCheck { salary: 50_000.0, existing_cards: 3 };
        assert_eq!(
            too_many.evaluate(),
            "Not Eligible - Too many existing cards (maximum 2 allowed)"
        );
    }

    #[test]
    fn test_visa_rules() {
        let citizen = VisaCheck { country: "India".into(), income: 0.0 };
        assert_eq!(citizen.evaluate(), "Eligible - Indian citizens are always eligible");

        let earner = VisaCheck { country: "USA".into(), income: 125_000.0 };
        assert_eq!(earner.evaluate(), "Eligible - Income meets requirement (₹125,000)");

        let low = VisaCheck { country: "UK".into(), income: 49_999.5 };
        assert!(low.evaluate().starts_with("Not Eligible"));
    }

    #[test]
    fn test_loan_rules() {
        let ok = LoanCheck { income: 30_000.0, credit_score: 700 };
        assert_eq!(ok.evaluate(), "Eligible - Income: ₹30,000, Credit Score: 700");

        let poor_income = LoanCheck { income: 20_000.0, credit_score: 800 };
        assert_eq!(
            poor_income.evaluate(),
            "Not Eligible - Income below minimum (₹30,000 required)"
        );

        let poor_score = LoanCheck { income: 90_000.0, credit_score: 650 };
        assert_eq!(
            poor_score.evaluate(),
            "Not Eligible - Credit score below minimum (700 required)"
        );
    }

    #[test]
    fn test_insurance_limit_is_inclusive() {
        let at_limit = InsuranceClaim { claim_amount: 200_000.0 };
        assert_eq!(at_limit.evaluate(), "Claim Approved - Amount: ₹200,000");

        let over = InsuranceClaim { claim_amount: 200_001.0 };
        assert!(over.evaluate().starts_with("Claim Under Review"));
    }

    #[test]
    fn test_schemes() {
        let senior_obc = SchemeCheck { caste: CasteCategory::Obc, annual_income: 400_000.0, age: 65 };
        assert_eq!(
            senior_obc.evaluate(),
            "OBC Scholarship Scheme, Senior Citizen Pension Scheme"
        );

        let sc = SchemeCheck { caste: CasteCategory::ScSt, annual_income: 300_000.0, age: 30 };
        assert_eq!(sc.eligible_schemes(), vec!["SC Development Grant"]);

        let none = SchemeCheck { caste: CasteCategory::General, annual_income: 250_001.0, age: 59 };
        assert_eq!(none.evaluate(), "No schemes available based on your criteria");
    }

    #[test]
    fn test_caste_parsing() {
        assert_eq!("SC/ST".parse::<CasteCategory>().unwrap(), CasteCategory::ScSt);
        assert_eq!("obc".parse::<CasteCategory>().unwrap(), CasteCategory::Obc);
        assert!("other".parse::<CasteCategory>().is_err());
    }

    #[test]
    fn test_to_log_record() {
        let log = CreditCardCheck { salary: 45_000.0, existing_cards: 1 }.to_log("user-1");
        assert_eq!(log.user_id, "user-1");
        assert_eq!(log.service_type, ServiceType::CreditCard);
        assert_eq!(log.input_data["existing_cards"], 1);
        assert_eq!(log.result, "Eligible - Salary: ₹45,000, Existing Cards: 1");
    }

    #[test]
    fn test_scheme_input_uses_display_category() {
        let check = SchemeCheck { caste: CasteCategory::ScSt, annual_income: 1.0, age: 1 };
        assert_eq!(check.input_data()["caste"], "SC/ST");
    }

    #[test]
    fn test_service_type_names() {
        assert_eq!(ServiceType::CreditCard.as_str(), "credit_card");
        assert_eq!(ServiceType::parse("government_scheme"), Some(ServiceType::GovernmentScheme));
        assert_eq!(ServiceType::parse("unknown"), None);
        assert_eq!(
            serde_json::to_string(&ServiceType::FormFiller).unwrap(),
            "\"form_filler\""
        );
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(999.0), "999");
        assert_eq!(format_amount(40_000.0), "40,000");
        assert_eq!(format_amount(1_234_567.0), "1,234,567");
        assert_eq!(format_amount(1_500.5), "1,500.5");
        assert_eq!(format_amount(12.25), "12.25");
    }
}
