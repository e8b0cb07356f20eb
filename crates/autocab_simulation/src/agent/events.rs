//! События агента: команды миссии + explainability
//!
//! Explanation — пассивный sink: подписчики (UI/лог) читают события и не
//! могут затормозить tick. StateChanged нужен тестам и наблюдателям.

use bevy::prelude::*;

use crate::components::AgentState;

/// Команда: начать миссию от узла start до узла end
#[derive(Event, Debug, Clone)]
pub struct MissionRequest {
    pub entity: Entity,
    pub start: String,
    pub end: String,
}

/// Команда: прервать миссию (выполняется на ближайшей границе tick'а)
#[derive(Event, Debug, Clone)]
pub struct MissionAbort {
    pub entity: Entity,
}

/// Человекочитаемое обоснование решения (XAI)
#[derive(Event, Debug, Clone)]
pub struct Explanation {
    pub entity: Entity,
    pub state: AgentState,
    pub text: String,
}

/// Ребро FSM (испускается только при реальной смене состояния)
#[derive(Event, Debug, Clone)]
pub struct StateChanged {
    pub entity: Entity,
    pub from: AgentState,
    pub to: AgentState,
}
