//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table.

use std::str::FromStr;

use sitewire_core::error::CoreError;
pub use sitewire_core::types::StatusId;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Return the seed-data name of this status.
            pub fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }

            /// Look up a status by its database ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $label => Ok($name::$variant), )+
                    other => Err(CoreError::Validation(format!(
                        "Unknown {} '{other}'",
                        stringify!($name)
                    ))),
                }
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.name())
            }
        }
    };
}

define_status_enum! {
    /// Delivery queue entry status (email and push queues).
    QueueStatus {
        Pending = 1 => "pending",
        Sending = 2 => "sending",
        Sent = 3 => "sent",
        Failed = 4 => "failed",
        Cancelled = 5 => "cancelled",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitewire_core::delivery::state_machine;

    #[test]
    fn ids_match_seed_order() {
        assert_eq!(QueueStatus::Pending.id(), 1);
        assert_eq!(QueueStatus::Cancelled.id(), 5);
    }

    #[test]
    fn names_match_core_state_machine() {
        for status in QueueStatus::ALL {
            assert_eq!(status.name(), state_machine::status_name(status.id()));
        }
    }

    #[test]
    fn parses_from_name_and_id() {
        assert_eq!("failed".parse::<QueueStatus>().unwrap(), QueueStatus::Failed);
        assert_eq!(QueueStatus::from_id(2), Some(QueueStatus::Sending));
        assert_eq!(QueueStatus::from_id(9), None);
        assert!("queued".parse::<QueueStatus>().is_err());
    }
}
