mod de;
mod ser;

pub use self::de::from_value;
pub use self::ser::{to_value, ValueWriter};
pub use crate::error::AvrokitErr;
