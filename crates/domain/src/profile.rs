use std::collections::BTreeMap;

use crate::AssignmentDeclaration;

/// Result of expanding a user's profile name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileExpansion {
    /// The user declares no profile, or an empty one.
    NoProfile,
    /// The profile is known and expands to its preset.
    Preset(Vec<AssignmentDeclaration>),
    /// The profile name is not in the catalog; no preset applies.
    Unrecognized(String),
}

impl ProfileExpansion {
    /// Returns the preset assignments, empty unless the profile is known.
    #[must_use]
    pub fn into_assignments(self) -> Vec<AssignmentDeclaration> {
        match self {
            Self::Preset(assignments) => assignments,
            Self::NoProfile | Self::Unrecognized(_) => Vec::new(),
        }
    }
}

/// Named presets of role assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCatalog {
    profiles: BTreeMap<String, Vec<AssignmentDeclaration>>,
}

impl ProfileCatalog {
    /// Creates a catalog from explicit profile presets.
    #[must_use]
    pub fn new(profiles: BTreeMap<String, Vec<AssignmentDeclaration>>) -> Self {
        Self { profiles }
    }

    /// Returns the built-in `sre`, `devops`, `developer` and `observability` presets.
    #[must_use]
    pub fn builtin() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(
            "sre".to_owned(),
            vec![
                AssignmentDeclaration::subscription("Reader"),
                AssignmentDeclaration::resource_group("Contributor", "rg-infra"),
                AssignmentDeclaration::resource_group("Contributor", "rg-observability"),
            ],
        );
        profiles.insert(
            "devops".to_owned(),
            vec![AssignmentDeclaration::subscription("Contributor")],
        );
        profiles.insert(
            "developer".to_owned(),
            vec![AssignmentDeclaration::subscription("Reader")],
        );
        profiles.insert(
            "observability".to_owned(),
            vec![
                AssignmentDeclaration::subscription("Reader"),
                AssignmentDeclaration::resource_group("Reader", "rg-observability"),
            ],
        );

        Self::new(profiles)
    }

    /// Returns a catalog with additional or replacing presets.
    #[must_use]
    pub fn with_profiles(
        mut self,
        profiles: impl IntoIterator<Item = (String, Vec<AssignmentDeclaration>)>,
    ) -> Self {
        self.profiles.extend(profiles);
        self
    }

    /// Returns known profile names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Expands a profile name into its preset assignments.
    #[must_use]
    pub fn expand(&self, profile: Option<&str>) -> ProfileExpansion {
        let Some(name) = profile.map(str::trim).filter(|value| !value.is_empty()) else {
            return ProfileExpansion::NoProfile;
        };

        match self.profiles.get(name) {
            Some(preset) => ProfileExpansion::Preset(preset.clone()),
            None => ProfileExpansion::Unrecognized(name.to_owned()),
        }
    }
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Concatenates preset and explicit assignments, presets first.
///
/// No deduplication happens: two entries resolving to the same role and scope
/// both survive and later share one assignment key.
#[must_use]
pub fn merge_assignments(
    preset: Vec<AssignmentDeclaration>,
    explicit: &[AssignmentDeclaration],
) -> Vec<AssignmentDeclaration> {
    let mut merged = preset;
    merged.extend_from_slice(explicit);
    merged
}
