//! Domain layer: enrollment entities, value objects, and the ports through which the
//! workflows reach the outside world.

pub mod application;
pub mod entity;
pub mod journal;
pub mod member;
pub mod money;
pub mod payment;
pub mod plan;
pub mod ports;
