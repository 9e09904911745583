//! Loan EMI / repayment notification parser

use std::sync::LazyLock;

use regex::Regex;

use super::{amount, deterministic_transaction, EmailParser};
use crate::models::{Direction, NewTransaction, RawEmail, TransactionType};

static LOAN_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:for|towards)\s+(?:your\s+)?([A-Za-z][A-Za-z ]{2,40}?loan)\b").unwrap()
});

static EMI_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bemi\b").unwrap());

static LOAN_ACCOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)loan\s*(?:a/c|account)\s*(?:no\.?|number)?\s*[:\-]?\s*([A-Z0-9]{6,20})")
        .unwrap()
});

pub struct LoanParser;

impl EmailParser for LoanParser {
    fn name(&self) -> &'static str {
        "loan"
    }

    fn can_parse(&self, email: &RawEmail) -> bool {
        let haystack = format!("{} {}", email.subject, email.body_text);
        EMI_WORD.is_match(&haystack) || haystack.to_lowercase().contains("loan")
    }

    fn parse(&self, email: &RawEmail) -> Option<Vec<NewTransaction>> {
        let body = &email.body_text;
        let value = amount::find_amount(body).or_else(|| amount::find_amount(&email.subject))?;

        let merchant = LOAN_NAME
            .captures(body)
            .or_else(|| LOAN_NAME.captures(&email.subject))
            .map(|c| titlecase_loan(&c[1]))
            .unwrap_or_else(|| "Loan EMI".to_string());

        // Repayments are money out
        let mut tx = deterministic_transaction(
            email,
            value,
            Direction::Debit,
            TransactionType::Loan,
            merchant,
        );
        if let Some(c) = LOAN_ACCOUNT.captures(body) {
            tx.reference = Some(c[1].to_string());
        }

        Some(vec![tx])
    }
}

/// "home loan" → "Home Loan"
fn titlecase_loan(raw: &str) -> String {
    raw.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::test_email;

    #[test]
    fn test_emi_debit_alert() {
        let email = test_email(
            "EMI payment confirmation",
            "Your EMI of Rs. 18,230.00 for your home loan has been debited on 05-01-2025. \
             Loan account no: HL00998877.",
        );
        let parser = LoanParser;
        assert!(parser.can_parse(&email));

        let txs = parser.parse(&email).unwrap();
        let tx = &txs[0];
        assert_eq!(tx.amount, 18_230.0);
        assert_eq!(tx.tx_type, TransactionType::Loan);
        assert_eq!(tx.direction, Direction::Debit);
        assert_eq!(tx.merchant, "Home Loan");
        assert_eq!(tx.reference.as_deref(), Some("HL00998877"));
    }

    #[test]
    fn test_generic_emi_without_loan_name() {
        let email = test_email("EMI due reminder", "EMI of INR 4,500 was deducted today.");
        let txs = LoanParser.parse(&email).unwrap();
        assert_eq!(txs[0].merchant, "Loan EMI");
    }

    #[test]
    fn test_titlecase() {
        assert_eq!(titlecase_loan("personal loan"), "Personal Loan");
        assert_eq!(titlecase_loan("Car loan"), "Car Loan");
    }
}
