pub mod certification;
pub mod skill;
