//! ECS Components такси
//!
//! Организация по доменам:
//! - vehicle: кузов (VehicleBody) и настройки привода (VehicleConfig)
//! - route: data model маршрута (RouteWaypoint, SegmentType, Mission)
//! - agent: FSM state, пороги decision-логики, телеметрия

pub mod agent;
pub mod route;
pub mod vehicle;

// Re-exports для удобного импорта
pub use agent::*;
pub use route::*;
pub use vehicle::*;
