//! Domain layer: records owned by the persistence collaborator, the order
//! payment state machine, and the delivery de-duplication set.

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum from
/// its variant-to-wire-name table.
macro_rules! str_enum {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Returns the lowercase wire name.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }

        impl ::std::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    other => Err(format!("unknown {}: {other}", stringify!($ty))),
                }
            }
        }
    };
}

pub mod customer;
pub mod idempotency;
pub mod inbound_event;
pub mod message;
pub mod order;
pub mod payment;
pub mod platform;
pub mod tenant;

pub use customer::Customer;
pub use idempotency::IdempotencyStore;
pub use inbound_event::InboundEvent;
pub use message::{Direction, Message};
pub use order::{Order, OrderStatus, PaymentOutcome, PaymentStatus};
pub use payment::{Payment, PaymentRecordStatus};
pub use platform::Platform;
pub use tenant::{ChannelAccount, UserSettings};
