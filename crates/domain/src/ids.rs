use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::DomainError;

macro_rules! server_id {
    ($name:ident, $kind:literal) => {
        /// Server-assigned identifier, reused as the local primary key.
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            pub fn new(value: i64) -> Result<Self, DomainError> {
                if value <= 0 {
                    return Err(DomainError::InvalidId {
                        kind: $kind,
                        value,
                    });
                }
                Ok(Self(value))
            }

            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = DomainError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

server_id!(CategoryId, "category");
server_id!(PictureId, "picture");
server_id!(TagId, "tag");
server_id!(UserId, "user");
