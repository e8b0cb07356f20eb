//! Источник маршрутов (external path source)
//!
//! Контракт: `request(start, end)` сразу возвращает handle, ответ агент
//! забирает неблокирующим `poll` на границе tick'а — tick driver никогда
//! не ждёт backend. Пустой маршрут — валидный исход («пути нет»),
//! отличный от ошибки получения.
//!
//! Инжектится ресурсом `RoutePlanner` (boxed trait object), никакого
//! глобального singleton'а.

use bevy::prelude::*;
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Mutex;
use thiserror::Error;

use crate::components::RouteWaypoint;

pub mod graph;

pub use graph::*;

pub type PlanResult = Result<Vec<RouteWaypoint>, PlanError>;

/// Ошибки получения маршрута. Терминальны для миссии: core не ретраит,
/// retry-политика — забота вызывающего.
#[derive(Debug, Clone, Error)]
pub enum PlanError {
    #[error("no waypoint node named `{0}` in the route graph")]
    NoSuchNode(String),
    #[error("path source dropped the request without answering")]
    SourceClosed,
    #[error("route backend error: {0}")]
    Backend(String),
}

/// Коллаборатор, умеющий отвечать на запросы маршрута
pub trait PathSource: Send + Sync {
    /// Асинхронный запрос; ответ придёт через handle
    fn request(&self, start: &str, end: &str) -> PathRequest;
}

/// Handle незавершённого запроса (promise со стороны потребителя).
///
/// Receiver завёрнут в Mutex: handle живёт на entity как часть компонента,
/// а компонентам нужен Sync. Контеншена нет — poll'ит только владелец.
pub struct PathRequest {
    rx: Mutex<mpsc::Receiver<PlanResult>>,
}

impl PathRequest {
    /// Пара (отправитель, handle) — для источников, отвечающих позже
    pub fn channel() -> (mpsc::Sender<PlanResult>, PathRequest) {
        let (tx, rx) = mpsc::channel();
        (tx, PathRequest { rx: Mutex::new(rx) })
    }

    /// Неблокирующая проверка «запрос готов?» (раз в tick)
    pub fn poll(&self) -> Option<PlanResult> {
        let Ok(rx) = self.rx.lock() else {
            return Some(Err(PlanError::SourceClosed));
        };
        match rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(PlanError::SourceClosed)),
        }
    }
}

/// Источник маршрутов как ресурс (dependency injection)
#[derive(Resource)]
pub struct RoutePlanner(pub Box<dyn PathSource>);

impl Default for RoutePlanner {
    fn default() -> Self {
        Self(Box::new(GraphSource::new()))
    }
}
