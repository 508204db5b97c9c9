//! Scope Registry
//!
//! Known scope descriptors. The registry is in-memory and seeded with the
//! standard OpenID scopes; a database-backed source can replace it without
//! touching the authorize endpoint.

use std::collections::BTreeMap;

/// A scope the server understands, with the text shown on the consent page.
#[derive(Debug, Clone)]
pub struct ScopeDescriptor {
    pub name: String,
    pub description: String,
}

/// Registry of known scopes.
pub struct ScopeRegistry {
    scopes: BTreeMap<String, ScopeDescriptor>,
}

impl ScopeRegistry {
    pub fn new(descriptors: impl IntoIterator<Item = ScopeDescriptor>) -> Self {
        Self {
            scopes: descriptors
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
        }
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.scopes.contains_key(scope)
    }

    pub fn get(&self, scope: &str) -> Option<&ScopeDescriptor> {
        self.scopes.get(scope)
    }

    pub fn names(&self) -> Vec<&str> {
        self.scopes.keys().map(String::as_str).collect()
    }

    /// Validate a space-separated scope string. Returns the first unknown
    /// scope on failure.
    pub fn validate<'a>(&self, scope: &'a str) -> Result<Vec<&'a str>, &'a str> {
        let mut valid = Vec::new();
        for s in scope.split_whitespace() {
            if !self.contains(s) {
                return Err(s);
            }
            valid.push(s);
        }
        Ok(valid)
    }
}

impl Default for ScopeRegistry {
    fn default() -> Self {
        Self::new([
            ScopeDescriptor {
                name: "openid".to_string(),
                description: "Confirm your identity".to_string(),
            },
            ScopeDescriptor {
                name: "profile".to_string(),
                description: "Read your name and profile details".to_string(),
            },
            ScopeDescriptor {
                name: "email".to_string(),
                description: "Read your email address".to_string(),
            },
            ScopeDescriptor {
                name: "offline_access".to_string(),
                description: "Keep access when you are offline".to_string(),
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scopes() {
        let registry = ScopeRegistry::default();
        assert!(registry.contains("openid"));
        assert!(registry.contains("email"));
        assert!(!registry.contains("admin"));
    }

    #[test]
    fn test_validate() {
        let registry = ScopeRegistry::default();
        assert_eq!(
            registry.validate("openid email").unwrap(),
            vec!["openid", "email"]
        );
        assert_eq!(registry.validate("openid bogus"), Err("bogus"));
        assert!(registry.validate("").unwrap().is_empty());
    }
}
