//! Internal / external classification of addresses against the organization's domains.

use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressClass {
    Internal,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub class: AddressClass,
    /// Set when the address has no `@`, an empty local part or an empty domain.
    /// Malformed addresses are always External.
    pub malformed: bool,
}

impl Classification {
    pub fn is_internal(&self) -> bool {
        self.class == AddressClass::Internal
    }
}

/// The set of domains that count as "our organization".
#[derive(Debug, Clone, Default)]
pub struct OrgDomains {
    domains: BTreeSet<String>,
}

impl OrgDomains {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_start_matches('@').to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Case-insensitive domain-suffix match: `a@x.org` and `a@mail.x.org`
    /// are internal when `x.org` is an organization domain.
    pub fn classify(&self, address: &str) -> Classification {
        let address = address.trim().to_lowercase();

        let Some((local, domain)) = address.rsplit_once('@') else {
            return Classification {
                class: AddressClass::External,
                malformed: true,
            };
        };

        if local.is_empty() || domain.is_empty() {
            return Classification {
                class: AddressClass::External,
                malformed: true,
            };
        }

        let internal = self.domains.iter().any(|org| {
            domain == org
                || domain
                    .strip_suffix(org.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        });

        Classification {
            class: if internal {
                AddressClass::Internal
            } else {
                AddressClass::External
            },
            malformed: false,
        }
    }

    /// A message is internal only when both ends belong to the organization.
    pub fn classify_message(&self, sender: &str, recipient: &str) -> AddressClass {
        if self.classify(sender).is_internal() && self.classify(recipient).is_internal() {
            AddressClass::Internal
        } else {
            AddressClass::External
        }
    }
}

/// Case-insensitive substring rules for automated senders (no-reply, bounces, ...).
#[derive(Debug, Clone, Default)]
pub struct NoiseFilter {
    patterns: Vec<String>,
}

impl NoiseFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { patterns }
    }

    pub fn is_noise(&self, address: &str) -> bool {
        let address = address.to_lowercase();
        self.patterns.iter().any(|p| address.contains(p.as_str()))
    }
}
