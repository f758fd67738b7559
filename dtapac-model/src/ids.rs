use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! portfolio_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn to_uuid(&self) -> Uuid {
                self.0
            }

            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

portfolio_id!(
    /// Identifier of a project in the portfolio.
    ProjectId
);
portfolio_id!(
    /// Identifier of a component (dependency) within a project.
    ComponentId
);
portfolio_id!(
    /// Identifier of a vulnerability record.
    VulnerabilityId
);
portfolio_id!(
    /// Identifier of a single policy violation instance.
    PolicyViolationId
);
