//! Built-in maskers.
//!
//! Maskers are pure string transformations. They check that the input looks
//! like their format and fail otherwise, so a malformed value never leaks
//! through half-masked.
//!
//! | format  | input                                  | output                                  |
//! |---------|----------------------------------------|-----------------------------------------|
//! | `ssn`   | `123-45-6789`                          | `***-**-6789`                           |
//! | `email` | `alice@example.com`                    | `a***@example.com`                      |
//! | `phone` | `(555) 123-4567`                       | `(***) ***-4567`                        |
//! | `card`  | `4111 1111 1111 1111`                  | `**** **** **** 1111`                   |
//! | `ip`    | `192.168.1.100`                        | `192.168.xxx.xxx`                       |
//! | `uuid`  | `550e8400-e29b-41d4-a716-446655440000` | `550e8400-****-****-****-************`  |
//! | `iban`  | `GB82WEST12345698765432`               | `GB82**************5432`                |
//! | `name`  | `John Smith`                           | `J*** S****`                            |

use std::sync::Arc;

use crate::capability::{CapabilityError, MaskType, Masker, MaskerMap};

const MASK_CHAR: char = '*';

/// Keeps selected segments visible while masking the remainder.
///
/// Operates on Unicode scalar values. If the visible segments cover the whole
/// value, the output is unchanged.
#[derive(Clone, Copy, Debug)]
pub(crate) struct KeepConfig {
    visible_prefix: usize,
    visible_suffix: usize,
}

impl KeepConfig {
    pub(crate) const fn first(visible_prefix: usize) -> Self {
        Self::both(visible_prefix, 0)
    }

    pub(crate) const fn last(visible_suffix: usize) -> Self {
        Self::both(0, visible_suffix)
    }

    pub(crate) const fn both(visible_prefix: usize, visible_suffix: usize) -> Self {
        Self {
            visible_prefix,
            visible_suffix,
        }
    }

    pub(crate) fn apply_to(self, value: &str) -> String {
        let total = value.chars().count();
        if self.visible_prefix + self.visible_suffix >= total {
            return value.to_string();
        }
        let masked_end = total - self.visible_suffix;
        value
            .chars()
            .enumerate()
            .map(|(i, ch)| {
                if i < self.visible_prefix || i >= masked_end {
                    ch
                } else {
                    MASK_CHAR
                }
            })
            .collect()
    }
}

fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

fn last_four(digits: &str) -> &str {
    &digits[digits.len() - 4..]
}

/// `123-45-6789` → `***-**-6789`. Requires exactly nine digits.
#[derive(Clone, Copy, Debug, Default)]
pub struct SsnMasker;

impl Masker for SsnMasker {
    fn mask(&self, value: &str) -> Result<String, CapabilityError> {
        let digits = digits(value);
        if digits.len() != 9 {
            return Err(CapabilityError::invalid_format(
                MaskType::Ssn,
                format!("requires exactly 9 digits, got {}", digits.len()),
            ));
        }
        Ok(format!("***-**-{}", last_four(&digits)))
    }
}

/// Keeps the first character of the local part and the whole domain.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmailMasker;

impl Masker for EmailMasker {
    fn mask(&self, value: &str) -> Result<String, CapabilityError> {
        let Some(at) = value.rfind('@').filter(|&at| at > 0) else {
            return Err(CapabilityError::invalid_format(
                MaskType::Email,
                "missing or misplaced @",
            ));
        };
        let (local, domain) = value.split_at(at);
        let first: String = local.chars().take(1).collect();
        Ok(format!("{first}***{domain}"))
    }
}

/// Keeps the last four digits. Requires at least seven.
#[derive(Clone, Copy, Debug, Default)]
pub struct PhoneMasker;

impl Masker for PhoneMasker {
    fn mask(&self, value: &str) -> Result<String, CapabilityError> {
        let digits = digits(value);
        if digits.len() < 7 {
            return Err(CapabilityError::invalid_format(
                MaskType::Phone,
                format!("requires at least 7 digits, got {}", digits.len()),
            ));
        }
        let last = last_four(&digits);
        Ok(if value.starts_with('(') && digits.len() >= 10 {
            format!("(***) ***-{last}")
        } else if digits.len() >= 10 {
            format!("***-***-{last}")
        } else {
            format!("***-{last}")
        })
    }
}

/// Keeps the last four digits of a 13 to 19 digit card number. Space or dash
/// grouping in the input is reproduced in groups of four.
#[derive(Clone, Copy, Debug, Default)]
pub struct CardMasker;

impl Masker for CardMasker {
    fn mask(&self, value: &str) -> Result<String, CapabilityError> {
        let digits = digits(value);
        if !(13..=19).contains(&digits.len()) {
            return Err(CapabilityError::invalid_format(
                MaskType::Card,
                format!("requires 13-19 digits, got {}", digits.len()),
            ));
        }
        let separator = if value.contains(' ') {
            " "
        } else if value.contains('-') {
            "-"
        } else {
            return Ok(KeepConfig::last(4).apply_to(&digits));
        };
        let groups = (digits.len() - 4).div_ceil(4);
        let mut masked = vec!["****"; groups];
        masked.push(last_four(&digits));
        Ok(masked.join(separator))
    }
}

/// IPv4 keeps the network octets, IPv6 the first four groups.
#[derive(Clone, Copy, Debug, Default)]
pub struct IpMasker;

impl IpMasker {
    /// Splits an IPv6 address into groups, expanding a single `::`.
    fn expand_v6<'a>(value: &'a str) -> Option<Vec<&'a str>> {
        let Some((left, right)) = value.split_once("::") else {
            return Some(value.split(':').collect());
        };
        if right.contains("::") {
            return None;
        }
        let groups = |text: &'a str| -> Vec<&'a str> {
            if text.is_empty() {
                Vec::new()
            } else {
                text.split(':').collect()
            }
        };
        let (left, right) = (groups(left), groups(right));
        let missing = 8usize.checked_sub(left.len() + right.len())?;
        let mut expanded = left;
        expanded.extend(std::iter::repeat("0000").take(missing));
        expanded.extend(right);
        Some(expanded)
    }
}

impl Masker for IpMasker {
    fn mask(&self, value: &str) -> Result<String, CapabilityError> {
        let octets: Vec<&str> = value.split('.').collect();
        if octets.len() == 4 {
            return Ok(format!("{}.{}.xxx.xxx", octets[0], octets[1]));
        }
        if value.contains(':') {
            return match Self::expand_v6(value) {
                Some(groups) if groups.len() == 8 => Ok(format!(
                    "{}:xxxx:xxxx:xxxx:xxxx",
                    groups[..4].join(":")
                )),
                _ => Err(CapabilityError::invalid_format(
                    MaskType::Ip,
                    "invalid IPv6 address",
                )),
            };
        }
        Err(CapabilityError::invalid_format(
            MaskType::Ip,
            "not an IPv4 or IPv6 address",
        ))
    }
}

/// Keeps the first segment of an 8-4-4-4-12 UUID.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidMasker;

impl Masker for UuidMasker {
    fn mask(&self, value: &str) -> Result<String, CapabilityError> {
        const SEGMENTS: [usize; 5] = [8, 4, 4, 4, 12];
        let parts: Vec<&str> = value.split('-').collect();
        if parts.len() != SEGMENTS.len() {
            return Err(CapabilityError::invalid_format(
                MaskType::Uuid,
                "requires 5 hyphen-separated segments",
            ));
        }
        for (i, (part, expected)) in parts.iter().zip(SEGMENTS).enumerate() {
            let len = part.chars().count();
            if len != expected {
                return Err(CapabilityError::invalid_format(
                    MaskType::Uuid,
                    format!("segment {} has length {len}, expected {expected}", i + 1),
                ));
            }
        }
        Ok(format!("{}-****-****-****-************", parts[0]))
    }
}

/// Keeps the country code, check digits and the last four characters.
#[derive(Clone, Copy, Debug, Default)]
pub struct IbanMasker;

impl Masker for IbanMasker {
    fn mask(&self, value: &str) -> Result<String, CapabilityError> {
        let len = value.chars().count();
        if !(15..=34).contains(&len) {
            return Err(CapabilityError::invalid_format(
                MaskType::Iban,
                format!("requires 15-34 characters, got {len}"),
            ));
        }
        if !value.chars().take(2).all(|ch| ch.is_ascii_alphabetic()) {
            return Err(CapabilityError::invalid_format(
                MaskType::Iban,
                "must start with a 2-letter country code",
            ));
        }
        Ok(KeepConfig::both(4, 4).apply_to(value))
    }
}

/// Keeps the first letter of each word. Whitespace runs collapse to one space.
#[derive(Clone, Copy, Debug, Default)]
pub struct NameMasker;

impl Masker for NameMasker {
    fn mask(&self, value: &str) -> Result<String, CapabilityError> {
        let words: Vec<String> = value
            .split_whitespace()
            .map(|word| KeepConfig::first(1).apply_to(word))
            .collect();
        if words.is_empty() {
            return Err(CapabilityError::invalid_format(
                MaskType::Name,
                "name cannot be empty",
            ));
        }
        Ok(words.join(" "))
    }
}

/// Maskers every processor starts with.
pub(crate) fn builtin_maskers() -> MaskerMap {
    let mut maskers = MaskerMap::new();
    for format in MaskType::ALL {
        let masker: Arc<dyn Masker> = match format {
            MaskType::Ssn => Arc::new(SsnMasker),
            MaskType::Email => Arc::new(EmailMasker),
            MaskType::Phone => Arc::new(PhoneMasker),
            MaskType::Card => Arc::new(CardMasker),
            MaskType::Ip => Arc::new(IpMasker),
            MaskType::Uuid => Arc::new(UuidMasker),
            MaskType::Iban => Arc::new(IbanMasker),
            MaskType::Name => Arc::new(NameMasker),
        };
        maskers.insert(*format, masker);
    }
    maskers
}
