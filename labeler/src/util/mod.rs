mod math;
pub use self::math::*;
