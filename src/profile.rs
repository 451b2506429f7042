use regex::Regex;

use crate::error::{ExtratoError, Result};

/// Id of the ad-hoc profile synthesized by the detector fallback.
pub const GENERIC_BANK: &str = "GENERIC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// 13/01/2025 — Brazilian bank exports
    Dmy,
    /// 01/13/2025
    Mdy,
    /// 2025-01-13
    Iso,
}

/// How a profile recognizes its own statements. Substrings are matched
/// case-insensitively against the lowercased header text and filename,
/// whatever case the needle was written in; regexes are matched as written.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    Substring(String),
    Regex(String),
}

impl Matcher {
    pub fn substring(s: &str) -> Self {
        Matcher::Substring(s.to_lowercase())
    }

    pub(crate) fn matches(&self, haystack_lower: &str) -> bool {
        match self {
            Matcher::Substring(needle) => haystack_lower.contains(needle.to_lowercase().as_str()),
            Matcher::Regex(pattern) => Regex::new(pattern)
                .map(|re| re.is_match(haystack_lower))
                .unwrap_or(false),
        }
    }
}

/// Which cell holds which role. Either `amount` is set (signed single column)
/// or the `debit`/`credit` pair is set, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnMap {
    pub date: usize,
    pub description: usize,
    pub amount: Option<usize>,
    pub debit: Option<usize>,
    pub credit: Option<usize>,
    pub balance: Option<usize>,
}

/// Declarative description of one institution's export layout plus the
/// markers used to recognize it. Adding a bank means registering a new
/// profile, never adding branches elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct BankProfile {
    pub id: String,
    pub priority: i32,
    pub matchers: Vec<Matcher>,
    pub delimiter: char,
    pub date_format: DateFormat,
    pub decimal_separator: char,
    pub columns: ColumnMap,
}

/// Ordered, immutable set of bank profiles. Sorted by descending priority,
/// registration order breaking ties, so detection is deterministic.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: Vec<BankProfile>,
}

impl ProfileRegistry {
    /// Validates and orders a profile set. Registry mistakes are programmer
    /// errors and fail loudly here, before any file is parsed.
    pub fn new(mut profiles: Vec<BankProfile>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for profile in &profiles {
            if !seen.insert(profile.id.clone()) {
                return Err(ExtratoError::DuplicateProfile(profile.id.clone()));
            }
            if profile.matchers.is_empty() {
                return Err(ExtratoError::NoMatchers(profile.id.clone()));
            }
            for matcher in &profile.matchers {
                if let Matcher::Regex(pattern) = matcher {
                    Regex::new(pattern).map_err(|e| {
                        ExtratoError::InvalidPattern(profile.id.clone(), pattern.clone(), e)
                    })?;
                }
            }
            let columns = &profile.columns;
            match (columns.amount, columns.debit, columns.credit) {
                (Some(_), None, None) => {}
                (None, Some(_), Some(_)) => {}
                (Some(_), _, _) => {
                    return Err(ExtratoError::InvalidColumnMap(
                        profile.id.clone(),
                        "amount column and debit/credit columns are mutually exclusive".into(),
                    ))
                }
                _ => {
                    return Err(ExtratoError::InvalidColumnMap(
                        profile.id.clone(),
                        "either an amount column or both debit and credit columns required".into(),
                    ))
                }
            }
        }
        // Stable sort keeps registration order within equal priorities.
        profiles.sort_by_key(|p| std::cmp::Reverse(p.priority));
        Ok(ProfileRegistry { profiles })
    }

    /// The built-in set, mirroring the Brazilian institutions the product
    /// ships support for.
    pub fn builtin() -> Self {
        Self::new(builtin_profiles()).expect("built-in profiles are valid")
    }

    pub fn all_profiles(&self) -> &[BankProfile] {
        &self.profiles
    }

    pub fn get(&self, id: &str) -> Option<&BankProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }
}

fn builtin_profiles() -> Vec<BankProfile> {
    vec![
        // Data;Histórico;Débito;Crédito;Saldo — the header itself is a
        // reliable marker, with or without accents.
        BankProfile {
            id: "BRADESCO".into(),
            priority: 100,
            matchers: vec![
                Matcher::substring("bradesco"),
                Matcher::substring("débito;crédito"),
                Matcher::substring("debito;credito"),
            ],
            delimiter: ';',
            date_format: DateFormat::Dmy,
            decimal_separator: ',',
            columns: ColumnMap {
                date: 0,
                description: 1,
                debit: Some(2),
                credit: Some(3),
                balance: Some(4),
                ..ColumnMap::default()
            },
        },
        // date,category,title,amount — ISO dates, dot decimals.
        BankProfile {
            id: "NUBANK".into(),
            priority: 100,
            matchers: vec![
                Matcher::substring("nubank"),
                Matcher::substring("nu pagamentos"),
            ],
            delimiter: ',',
            date_format: DateFormat::Iso,
            decimal_separator: '.',
            columns: ColumnMap {
                date: 0,
                description: 2,
                amount: Some(3),
                ..ColumnMap::default()
            },
        },
        BankProfile {
            id: "BANCO_DO_BRASIL".into(),
            priority: 90,
            matchers: vec![
                Matcher::substring("banco do brasil"),
                Matcher::substring("bancodobrasil"),
            ],
            delimiter: ',',
            date_format: DateFormat::Dmy,
            decimal_separator: ',',
            columns: ColumnMap {
                date: 0,
                description: 1,
                amount: Some(2),
                ..ColumnMap::default()
            },
        },
        BankProfile {
            id: "ITAU".into(),
            priority: 90,
            matchers: vec![Matcher::substring("itaú"), Matcher::substring("itau")],
            delimiter: ';',
            date_format: DateFormat::Dmy,
            decimal_separator: ',',
            columns: ColumnMap {
                date: 0,
                description: 1,
                amount: Some(2),
                balance: Some(3),
                ..ColumnMap::default()
            },
        },
        BankProfile {
            id: "SANTANDER".into(),
            priority: 90,
            matchers: vec![Matcher::substring("santander")],
            delimiter: ';',
            date_format: DateFormat::Dmy,
            decimal_separator: ',',
            columns: ColumnMap {
                date: 0,
                description: 1,
                amount: Some(2),
                balance: Some(3),
                ..ColumnMap::default()
            },
        },
        BankProfile {
            id: "CAIXA".into(),
            priority: 80,
            matchers: vec![
                Matcher::substring("caixa econômica"),
                Matcher::substring("caixa economica"),
                Matcher::substring("caixa"),
            ],
            delimiter: ';',
            date_format: DateFormat::Dmy,
            decimal_separator: ',',
            columns: ColumnMap {
                date: 0,
                description: 1,
                amount: Some(2),
                balance: Some(3),
                ..ColumnMap::default()
            },
        },
        BankProfile {
            id: "C6_BANK".into(),
            priority: 80,
            matchers: vec![Matcher::substring("c6 bank"), Matcher::substring("c6bank")],
            delimiter: ',',
            date_format: DateFormat::Dmy,
            decimal_separator: ',',
            columns: ColumnMap {
                date: 0,
                description: 1,
                amount: Some(2),
                ..ColumnMap::default()
            },
        },
        // "inter" substring-matches far too much ("internacional", ...),
        // so this profile sits below every other marker.
        BankProfile {
            id: "INTER".into(),
            priority: 10,
            matchers: vec![
                Matcher::substring("banco inter"),
                Matcher::substring("inter"),
            ],
            delimiter: ';',
            date_format: DateFormat::Dmy,
            decimal_separator: ',',
            columns: ColumnMap {
                date: 0,
                description: 1,
                amount: Some(2),
                balance: Some(3),
                ..ColumnMap::default()
            },
        },
    ]
}
