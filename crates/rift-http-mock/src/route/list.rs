use super::Route;
use crate::error::{Error, Result};
use crate::pattern::Pattern;
use std::ops::Index;

/// Ordered routes with pattern identity and name lookup.
#[derive(Debug, Clone, Default)]
pub struct RouteList {
    routes: Vec<Route>,
}

impl RouteList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route, returning the route that ends up registered.
    ///
    /// A route with the same pattern as an existing one updates that route in place,
    /// so handles to it stay valid and its calls are kept. A name already in use
    /// moves to the added pattern.
    pub fn add(&mut self, route: Route, name: Option<&str>) -> Route {
        let name = name.map(str::to_string).or_else(|| route.name());
        let mut existing = name.as_deref().and_then(|name| self.by_name(name));
        if let Some(named) = &existing {
            named.clear_name();
        }

        if let Some(index) = self.routes.iter().position(|r| r.pattern_eq(&route)) {
            let same_pattern = self.routes[index].clone();
            match &existing {
                Some(named) if !named.pattern_eq(&route) => {
                    same_pattern.clear_name();
                    self.routes.remove(index);
                }
                Some(_) => {}
                None => {
                    same_pattern.clear_name();
                    existing = Some(same_pattern);
                }
            }
        }

        let route = match existing {
            Some(existing) => {
                existing.absorb(&route);
                existing
            }
            None => {
                self.routes.push(route.clone());
                route
            }
        };

        if let Some(name) = name {
            route.set_name(name);
        }
        route
    }

    /// Name a registered route. Fails if another route already has the name.
    pub(crate) fn rename(&self, route: &Route, name: &str) -> Result<Route> {
        let index = self
            .position(route)
            .ok_or_else(|| Error::RouteNotFound(route.to_string()))?;
        if self.by_name(name).is_some_and(|holder| !holder.is_same(route)) {
            return Err(Error::DuplicateName(name.to_string()));
        }
        Ok(self.routes[index].set_name(name))
    }

    /// Append without pattern identity checks.
    pub fn push(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn by_name(&self, name: &str) -> Option<Route> {
        self.routes
            .iter()
            .find(|r| r.name().as_deref() == Some(name))
            .cloned()
    }

    pub fn by_pattern(&self, pattern: &Pattern) -> Option<Route> {
        self.routes.iter().find(|r| r.has_pattern(pattern)).cloned()
    }

    pub fn position(&self, route: &Route) -> Option<usize> {
        self.routes.iter().position(|r| r.is_same(route))
    }

    /// Remove and return the route with the given name.
    pub fn pop(&mut self, name: &str) -> Option<Route> {
        let index = self
            .routes
            .iter()
            .position(|r| r.name().as_deref() == Some(name))?;
        Some(self.routes.remove(index))
    }

    pub(crate) fn remove_at(&mut self, index: usize) -> Route {
        self.routes.remove(index)
    }

    pub fn get(&self, index: usize) -> Option<&Route> {
        self.routes.get(index)
    }

    pub fn clear(&mut self) {
        self.routes.clear();
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub(crate) fn to_vec(&self) -> Vec<Route> {
        self.routes.clone()
    }
}

impl Index<usize> for RouteList {
    type Output = Route;

    fn index(&self, index: usize) -> &Route {
        &self.routes[index]
    }
}

impl<'a> IntoIterator for &'a RouteList {
    type Item = &'a Route;
    type IntoIter = std::slice::Iter<'a, Route>;

    fn into_iter(self) -> Self::IntoIter {
        self.routes.iter()
    }
}
