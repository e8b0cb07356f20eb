//! In-memory граф дорог: именованные узлы + направленные CONNECTED_TO рёбра
//!
//! Замена графовой БД: кратчайший путь по числу хопов (BFS), узлы несут
//! семантику (тип участка, лимит скорости, описание для объяснений).

use bevy::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::components::{RouteWaypoint, SegmentType};

use super::{PathRequest, PathSource, PlanError, PlanResult};

/// Узел графа дорог
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub position: Vec3,
    pub segment: SegmentType,
    /// 0 => лимита нет
    pub speed_limit: f32,
    pub description: String,
}

/// Источник маршрутов поверх локального графа
#[derive(Debug, Clone, Default)]
pub struct GraphSource {
    nodes: HashMap<String, GraphNode>,
    edges: HashMap<String, Vec<String>>,
}

impl GraphSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: impl Into<String>, node: GraphNode) {
        self.nodes.insert(name.into(), node);
    }

    /// Направленное ребро from → to
    pub fn connect(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.edges.entry(from.into()).or_default().push(to.into());
    }

    /// Кратчайший путь в хопах; несвязанные узлы — пустой результат
    fn shortest_path(&self, start: &str, end: &str) -> PlanResult {
        for name in [start, end] {
            if !self.nodes.contains_key(name) {
                return Err(PlanError::NoSuchNode(name.to_string()));
            }
        }

        // BFS от start
        let mut previous: HashMap<&str, &str> = HashMap::new();
        let mut seen: HashSet<&str> = HashSet::from([start]);
        let mut frontier: VecDeque<&str> = VecDeque::from([start]);

        while let Some(name) = frontier.pop_front() {
            if name == end {
                break;
            }
            for next in self.edges.get(name).into_iter().flatten() {
                if seen.insert(next) {
                    previous.insert(next, name);
                    frontier.push_back(next);
                }
            }
        }

        // Восстановление цепочки end → start
        let mut chain = vec![end];
        let mut cursor = end;
        while cursor != start {
            match previous.get(cursor) {
                Some(parent) => {
                    cursor = parent;
                    chain.push(cursor);
                }
                // Пути нет — валидный исход, не ошибка
                None => return Ok(Vec::new()),
            }
        }
        chain.reverse();

        Ok(chain
            .into_iter()
            .filter_map(|name| self.nodes.get(name))
            .map(|node| RouteWaypoint {
                position: node.position,
                segment: node.segment,
                speed_limit: node.speed_limit,
                description: node.description.clone(),
            })
            .collect())
    }
}

impl PathSource for GraphSource {
    fn request(&self, start: &str, end: &str) -> PathRequest {
        let (tx, request) = PathRequest::channel();
        // Граф локальный, ответ готов сразу; настоящий backend отправил бы позже
        let _ = tx.send(self.shortest_path(start, end));
        request
    }
}
