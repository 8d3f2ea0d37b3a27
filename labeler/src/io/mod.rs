mod pose;
pub use self::pose::*;

mod publish;
pub use self::publish::*;

mod simulator;
pub use self::simulator::*;

mod writer;
pub use self::writer::*;
