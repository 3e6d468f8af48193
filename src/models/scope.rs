//! Permission scopes for API v1 keys.
//!
//! Scopes are `resource:action` identifiers. Keys persist them as plain
//! strings; on every request they are parsed into [`GrantedScopes`], and
//! strings this build does not know (e.g. a scope added by a newer deploy)
//! are kept aside and never satisfy a route requirement.

use std::{collections::HashSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A single permission unit checked per route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "read:appointments")]
    ReadAppointments,
    #[serde(rename = "write:appointments")]
    WriteAppointments,
    #[serde(rename = "read:pets")]
    ReadPets,
    #[serde(rename = "write:pets")]
    WritePets,
    #[serde(rename = "read:customers")]
    ReadCustomers,
    #[serde(rename = "write:customers")]
    WriteCustomers,
    #[serde(rename = "read:services")]
    ReadServices,
    #[serde(rename = "write:services")]
    WriteServices,
    #[serde(rename = "read:staff")]
    ReadStaff,
    #[serde(rename = "read:inventory")]
    ReadInventory,
    #[serde(rename = "write:inventory")]
    WriteInventory,
    #[serde(rename = "read:invoices")]
    ReadInvoices,
    #[serde(rename = "write:invoices")]
    WriteInvoices,
    #[serde(rename = "read:locations")]
    ReadLocations,
    #[serde(rename = "read:analytics")]
    ReadAnalytics,
    #[serde(rename = "read:webhooks")]
    ReadWebhooks,
    #[serde(rename = "write:webhooks")]
    WriteWebhooks,
}

impl Scope {
    /// Every scope the registry knows, in display order.
    pub const ALL: &'static [Scope] = &[
        Scope::ReadAppointments,
        Scope::WriteAppointments,
        Scope::ReadPets,
        Scope::WritePets,
        Scope::ReadCustomers,
        Scope::WriteCustomers,
        Scope::ReadServices,
        Scope::WriteServices,
        Scope::ReadStaff,
        Scope::ReadInventory,
        Scope::WriteInventory,
        Scope::ReadInvoices,
        Scope::WriteInvoices,
        Scope::ReadLocations,
        Scope::ReadAnalytics,
        Scope::ReadWebhooks,
        Scope::WriteWebhooks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::ReadAppointments => "read:appointments",
            Scope::WriteAppointments => "write:appointments",
            Scope::ReadPets => "read:pets",
            Scope::WritePets => "write:pets",
            Scope::ReadCustomers => "read:customers",
            Scope::WriteCustomers => "write:customers",
            Scope::ReadServices => "read:services",
            Scope::WriteServices => "write:services",
            Scope::ReadStaff => "read:staff",
            Scope::ReadInventory => "read:inventory",
            Scope::WriteInventory => "write:inventory",
            Scope::ReadInvoices => "read:invoices",
            Scope::WriteInvoices => "write:invoices",
            Scope::ReadLocations => "read:locations",
            Scope::ReadAnalytics => "read:analytics",
            Scope::ReadWebhooks => "read:webhooks",
            Scope::WriteWebhooks => "write:webhooks",
        }
    }

    /// Human description shown when issuing keys.
    pub fn description(&self) -> &'static str {
        match self {
            Scope::ReadAppointments => "View appointments and their status",
            Scope::WriteAppointments => "Create, reschedule and cancel appointments",
            Scope::ReadPets => "View pet profiles and medical summaries",
            Scope::WritePets => "Create and update pet profiles",
            Scope::ReadCustomers => "View customer contact details",
            Scope::WriteCustomers => "Create and update customers",
            Scope::ReadServices => "View the service catalogue and prices",
            Scope::WriteServices => "Manage the service catalogue",
            Scope::ReadStaff => "View staff members and schedules",
            Scope::ReadInventory => "View inventory items and stock levels",
            Scope::WriteInventory => "Adjust inventory and stock levels",
            Scope::ReadInvoices => "View invoices and payments",
            Scope::WriteInvoices => "Create invoices and record payments",
            Scope::ReadLocations => "View practice locations",
            Scope::ReadAnalytics => "View aggregated practice analytics",
            Scope::ReadWebhooks => "View webhook subscriptions",
            Scope::WriteWebhooks => "Manage webhook subscriptions",
        }
    }

    pub fn is_read(&self) -> bool {
        self.as_str().starts_with("read:")
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scope: {0}")]
pub struct UnknownScope(pub String);

impl FromStr for Scope {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::ALL
            .iter()
            .copied()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| UnknownScope(s.to_string()))
    }
}

/// Named scope sets offered when issuing a key.
///
/// Bundles are expanded into concrete scopes before a key is stored;
/// authorization never looks at bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeBundle {
    Readonly,
    Full,
    Appointments,
    Pets,
    Customers,
    Inventory,
    Billing,
}

impl ScopeBundle {
    pub fn scopes(&self) -> Vec<Scope> {
        match self {
            ScopeBundle::Readonly => Scope::ALL.iter().copied().filter(Scope::is_read).collect(),
            ScopeBundle::Full => Scope::ALL.to_vec(),
            ScopeBundle::Appointments => vec![
                Scope::ReadAppointments,
                Scope::WriteAppointments,
                Scope::ReadPets,
                Scope::ReadCustomers,
                Scope::ReadServices,
                Scope::ReadStaff,
                Scope::ReadLocations,
            ],
            ScopeBundle::Pets => vec![Scope::ReadPets, Scope::WritePets, Scope::ReadCustomers],
            ScopeBundle::Customers => vec![
                Scope::ReadCustomers,
                Scope::WriteCustomers,
                Scope::ReadPets,
            ],
            ScopeBundle::Inventory => vec![
                Scope::ReadInventory,
                Scope::WriteInventory,
                Scope::ReadLocations,
            ],
            ScopeBundle::Billing => vec![
                Scope::ReadInvoices,
                Scope::WriteInvoices,
                Scope::ReadCustomers,
                Scope::ReadServices,
            ],
        }
    }
}

/// Scopes granted to one key, parsed from its persisted strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantedScopes {
    known: HashSet<Scope>,
    unknown: Vec<String>,
}

impl GrantedScopes {
    pub fn from_strings<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut granted = GrantedScopes::default();
        for value in raw {
            let value = value.as_ref();
            match value.parse::<Scope>() {
                Ok(scope) => {
                    granted.known.insert(scope);
                }
                Err(_) => granted.unknown.push(value.to_string()),
            }
        }
        granted
    }

    pub fn has_scope(&self, required: Scope) -> bool {
        self.known.contains(&required)
    }

    pub fn has_any_scope(&self, required: &[Scope]) -> bool {
        required.iter().any(|scope| self.known.contains(scope))
    }

    pub fn has_all_scopes(&self, required: &[Scope]) -> bool {
        required.iter().all(|scope| self.known.contains(scope))
    }

    /// Persisted strings the registry does not recognise.
    pub fn unknown(&self) -> &[String] {
        &self.unknown
    }

    /// Known scopes in registry order.
    pub fn to_vec(&self) -> Vec<Scope> {
        let mut scopes: Vec<Scope> = self.known.iter().copied().collect();
        scopes.sort();
        scopes
    }
}

/// Result of partitioning candidate scope strings against the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeValidation {
    pub valid: Vec<Scope>,
    pub invalid: Vec<String>,
}

impl ScopeValidation {
    pub fn is_valid(&self) -> bool {
        self.invalid.is_empty()
    }
}

/// Split arbitrary strings into registry scopes and rejects.
pub fn validate_scopes<I, S>(candidates: I) -> ScopeValidation
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut validation = ScopeValidation::default();
    for candidate in candidates {
        let candidate = candidate.as_ref();
        match candidate.trim().parse::<Scope>() {
            Ok(scope) if !validation.valid.contains(&scope) => validation.valid.push(scope),
            Ok(_) => {}
            Err(_) => validation.invalid.push(candidate.to_string()),
        }
    }
    validation
}
