// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Turn-by-turn navigation along a [Route].

mod observer;
mod request;
mod turns;

pub use observer::{NavigatorObserver, ObserverHandle, ObserverRegistry};
pub use request::{RequestId, RouteCallback};
pub use turns::{NavigatorTurn, SECOND_TURN_DISTANCE};

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bitflags::bitflags;
use log::{debug, info, warn};

use crate::geometry::{wrap_degrees, Point};
use crate::instructions::{EnglishInstructions, Instructions};
use crate::profile::Profile;
use crate::route::{NearestSegmentInfo, Route, RouteBuilder, RouteSegment};
use crate::{CancellationToken, Error, RoutePoint, Router};
use request::{Finished, Request, RequestKind, RouteRequests};
use turns::TurnWindow;

/// The destination counts as reached once less than this many metres of the route remain.
pub const ARRIVAL_DISTANCE: f64 = 20.0;

/// Travelling at more than this angle (in degrees) to the route means going the wrong way.
pub const TURN_ROUND_ANGLE: f64 = 135.0;

/// Off the route, a re-route is needed after travelling this many times
/// [NavigatorParam::route_distance_tolerance].
pub const OFF_ROUTE_DISTANCE_FACTOR: f64 = 10.0;

/// State of a [Navigator].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NavigationState {
    /// No route is installed, or navigation is disabled.
    #[default]
    None,

    /// A route is installed, but no position was received yet.
    NoPosition,

    /// On the route, heading towards the next turn.
    Turn,

    /// The last position was too far from the route.
    OffRoute,

    /// Off the route for long enough that a new route is needed,
    /// see [Navigator::reroute].
    ReRouteNeeded,

    /// A new route was just installed after leaving the old one.
    ReRouteDone,

    /// On the route, but travelling in the wrong direction.
    TurnRound,

    /// The destination was reached.
    Arrival,
}

impl NavigationState {
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::NoPosition => "no_position",
            Self::Turn => "turn",
            Self::OffRoute => "off_route",
            Self::ReRouteNeeded => "re_route_needed",
            Self::ReRouteDone => "re_route_done",
            Self::TurnRound => "turn_round",
            Self::Arrival => "arrival",
        }
    }
}

impl fmt::Display for NavigationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Which fields of [NavigationData] are valid.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NavigationValidity: u32 {
        const TIME = 1;
        const POSITION = 2;
        const SPEED = 4;
        const COURSE = 8;
        const HEIGHT = 16;
    }
}

/// A position fix, e.g. from a GPS receiver.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NavigationData {
    pub validity: NavigationValidity,

    /// Seconds since the Unix epoch. If invalid, the system clock is used.
    pub time: f64,

    /// Position in map units.
    pub position: Point,

    /// Speed in km/h.
    pub speed: f64,

    /// Direction of travel, as a bearing. If invalid, it is derived from the
    /// displacement since the previous fix.
    pub course: f64,

    /// Height in metres.
    pub height: f64,
}

impl NavigationData {
    /// Creates a fix with a valid position and time.
    pub fn new(position: Point, time: f64) -> Self {
        Self {
            validity: NavigationValidity::POSITION | NavigationValidity::TIME,
            time,
            position,
            ..Default::default()
        }
    }

    pub fn with_course(mut self, course: f64) -> Self {
        self.course = course;
        self.validity |= NavigationValidity::COURSE;
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self.validity |= NavigationValidity::SPEED;
        self
    }
}

/// Options of a [Navigator].
///
/// Zero (or negative) tolerances are replaced by their defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigatorParam {
    /// Fixes closer than this (in metres) to the previous one are ignored. Defaults to 5.
    pub minimum_fix_distance: f64,

    /// Positions further than this (in metres) from the route are off route. Defaults to 20.
    pub route_distance_tolerance: f64,

    /// Seconds spent off route before a re-route is needed. Defaults to 30.
    pub route_time_tolerance: f64,

    /// Re-route automatically once needed, if a [Router] is set.
    pub auto_reroute: bool,

    pub navigation_enabled: bool,
}

impl Default for NavigatorParam {
    fn default() -> Self {
        Self {
            minimum_fix_distance: Self::DEFAULT_MINIMUM_FIX_DISTANCE,
            route_distance_tolerance: Self::DEFAULT_ROUTE_DISTANCE_TOLERANCE,
            route_time_tolerance: Self::DEFAULT_ROUTE_TIME_TOLERANCE,
            auto_reroute: true,
            navigation_enabled: true,
        }
    }
}

impl NavigatorParam {
    pub const DEFAULT_MINIMUM_FIX_DISTANCE: f64 = 5.0;
    pub const DEFAULT_ROUTE_DISTANCE_TOLERANCE: f64 = 20.0;
    pub const DEFAULT_ROUTE_TIME_TOLERANCE: f64 = 30.0;

    pub fn normalized(&self) -> Self {
        fn or_default(v: f64, default: f64) -> f64 {
            if v > 0.0 && v.is_finite() {
                v
            } else {
                default
            }
        }

        Self {
            minimum_fix_distance: or_default(
                self.minimum_fix_distance,
                Self::DEFAULT_MINIMUM_FIX_DISTANCE,
            ),
            route_distance_tolerance: or_default(
                self.route_distance_tolerance,
                Self::DEFAULT_ROUTE_DISTANCE_TOLERANCE,
            ),
            route_time_tolerance: or_default(
                self.route_time_tolerance,
                Self::DEFAULT_ROUTE_TIME_TOLERANCE,
            ),
            ..*self
        }
    }
}

/// Time and distance travelled since leaving the route.
#[derive(Debug, Clone, Copy, Default)]
struct OffRoute {
    time: f64,
    distance: f64,
}

/// Follows a traveller along a [Route].
///
/// The navigator is driven by [Navigator::navigate], called with every position fix.
/// It reports its [NavigationState] and the upcoming turns to registered
/// [NavigatorObservers](NavigatorObserver), always in the order: route change,
/// turn change, state change.
///
/// Routes may be computed synchronously ([Navigator::start_navigation]) or on a
/// worker thread ([Navigator::request_route]); results of asynchronous requests
/// are applied only on the navigator's thread, when the navigator is polled.
pub struct Navigator {
    param: NavigatorParam,
    router: Option<Arc<dyn Router>>,
    instructions: Box<dyn Instructions>,
    locale: String,
    metric_units: bool,
    abbreviate: bool,
    observers: ObserverRegistry,
    requests: RouteRequests,

    route: Option<Route>,
    waypoints: Vec<RoutePoint>,
    state: NavigationState,
    last_fix: Option<NavigationData>,
    nearest: Option<NearestSegmentInfo>,
    turns: Option<TurnWindow>,
    off_route: OffRoute,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(NavigatorParam::default())
    }
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("param", &self.param)
            .field("state", &self.state)
            .field("route", &self.route.as_ref().map(|r| r.segments.len()))
            .field("position", &self.last_fix.map(|f| f.position))
            .finish_non_exhaustive()
    }
}

impl Navigator {
    pub fn new(param: NavigatorParam) -> Self {
        Self {
            param: param.normalized(),
            router: None,
            instructions: Box::new(EnglishInstructions),
            locale: "en".to_string(),
            metric_units: true,
            abbreviate: false,
            observers: ObserverRegistry::new(),
            requests: RouteRequests::default(),
            route: None,
            waypoints: Vec::default(),
            state: NavigationState::None,
            last_fix: None,
            nearest: None,
            turns: None,
            off_route: OffRoute::default(),
        }
    }

    pub fn set_router(&mut self, router: Arc<dyn Router>) {
        self.router = Some(router);
    }

    pub fn with_router(mut self, router: Arc<dyn Router>) -> Self {
        self.set_router(router);
        self
    }

    /// Replaces the [Instructions] used by [Navigator::turn_instructions].
    pub fn set_instructions(&mut self, instructions: Box<dyn Instructions>) {
        self.instructions = instructions;
        self.clear_instructions();
    }

    /// Sets the locale and units used by [Navigator::turn_instructions].
    pub fn set_instruction_options(&mut self, locale: &str, metric_units: bool, abbreviate: bool) {
        self.locale = locale.to_string();
        self.metric_units = metric_units;
        self.abbreviate = abbreviate;
        self.clear_instructions();
    }

    pub fn param(&self) -> &NavigatorParam {
        &self.param
    }

    pub fn set_param(&mut self, param: NavigatorParam) {
        let was_enabled = self.param.navigation_enabled;
        self.param = param.normalized();
        self.param.navigation_enabled = was_enabled;
        self.enable_navigation(param.navigation_enabled);
    }

    /// Returns the observer registry. Clones of the registry may be kept
    /// to add or remove observers later, including from within a notification.
    pub fn observers(&self) -> &ObserverRegistry {
        &self.observers
    }

    pub fn add_observer(&self, observer: Arc<dyn NavigatorObserver>) -> ObserverHandle {
        self.observers.add(observer)
    }

    pub fn remove_observer(&self, handle: ObserverHandle) -> bool {
        self.observers.remove(handle)
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    /// Returns the waypoints of the current route, starting with its start point.
    pub fn waypoints(&self) -> &[RoutePoint] {
        &self.waypoints
    }

    fn set_state(&mut self, state: NavigationState) {
        if state != self.state {
            debug!("navigation state: {} -> {}", self.state, state);
            self.state = state;
            self.observers.notify_state(state);
        }
    }

    fn set_turns(&mut self, window: Option<TurnWindow>) {
        let Some(window) = window else {
            return;
        };
        if self.turns.as_ref() != Some(&window) {
            self.observers.notify_turn(
                &window.first,
                window.second.as_ref(),
                window.continuation.as_ref(),
            );
            self.turns = Some(window);
        }
    }

    fn clear_instructions(&mut self) {
        if let Some(w) = self.turns.as_mut() {
            w.first.instructions = None;
            if let Some(t) = w.second.as_mut() {
                t.instructions = None;
            }
            if let Some(t) = w.continuation.as_mut() {
                t.instructions = None;
            }
        }
    }

    fn reset_position(&mut self) {
        self.last_fix = None;
        self.nearest = None;
        self.turns = None;
        self.off_route = OffRoute::default();
    }

    /// Installs a route to navigate along. `waypoints` should start with the route's
    /// start point; if empty, the waypoints are taken from the route's sections.
    ///
    /// An empty route removes the current route, like [Navigator::end_navigation].
    /// An outstanding re-route of the previous route is cancelled.
    pub fn use_route(&mut self, route: Route, waypoints: Vec<RoutePoint>) {
        if route.is_empty() {
            self.end_navigation();
            return;
        }

        if self.requests.pending_kind() == Some(RequestKind::Reroute) {
            debug!("new route installed, dropping the re-route request");
            self.requests.cancel();
        }

        info!(
            "installing route: {} segments, {:.0} m, {:.0} s",
            route.segments.len(),
            route.distance,
            route.time
        );
        self.waypoints = if waypoints.is_empty() {
            waypoints_of(&route)
        } else {
            waypoints
        };
        self.reset_position();
        self.observers.notify_route(Some(&route));
        self.route = Some(route);

        if self.param.navigation_enabled {
            self.set_state(NavigationState::NoPosition);
        } else {
            self.set_state(NavigationState::None);
        }
    }

    /// Installs a route computed after leaving the previous one,
    /// keeping the current position.
    fn use_rerouted(&mut self, route: Route, waypoints: Vec<RoutePoint>) {
        if route.is_empty() {
            self.set_state(NavigationState::ReRouteNeeded);
            return;
        }

        info!(
            "installing new route after leaving the old one: {} segments, {:.0} m",
            route.segments.len(),
            route.distance
        );
        let last_fix = self.last_fix;
        self.reset_position();
        self.last_fix = last_fix;
        self.waypoints = waypoints;
        self.observers.notify_route(Some(&route));

        if let Some(fix) = last_fix {
            if let Some(info) = self.match_position(&route, fix.position) {
                self.nearest = Some(info);
                self.set_turns(TurnWindow::ahead(&route, &info));
            }
        }
        self.route = Some(route);

        if self.param.navigation_enabled {
            self.set_state(NavigationState::ReRouteDone);
        }
    }

    fn router(&self) -> Result<Arc<dyn Router>, Error> {
        self.router
            .clone()
            .ok_or_else(|| Error::InvalidArgument("no router set".to_string()))
    }

    /// Computes a route on the calling thread and starts navigating along it.
    /// On failure, the current route stays in place.
    pub fn start_navigation(
        &mut self,
        profile: &Profile,
        waypoints: &[RoutePoint],
    ) -> Result<(), Error> {
        let router = self.router()?;
        let raw = router.find_route(profile, waypoints, false, &CancellationToken::new())?;
        let route = RouteBuilder::build(profile, &raw)?;
        self.use_route(route, waypoints.to_vec());
        return Ok(());
    }

    /// Starts computing a route on a worker thread. The route is installed, and
    /// `callback` called, once the result is picked up by [Navigator::poll_route_request],
    /// [Navigator::wait_for_route_request] or [Navigator::navigate].
    ///
    /// Fails with [Error::Busy] if a request is outstanding, unless `override_outstanding`
    /// is set; the outstanding request is then cancelled, and its callback receives
    /// [Error::Cancel] before this function returns.
    pub fn request_route(
        &mut self,
        profile: &Profile,
        waypoints: &[RoutePoint],
        override_outstanding: bool,
        callback: Option<RouteCallback>,
    ) -> Result<RequestId, Error> {
        let request = Request {
            router: self.router()?,
            profile: profile.clone(),
            waypoints: waypoints.to_vec(),
            kind: RequestKind::External,
            callback,
        };
        self.requests.submit(request, override_outstanding)
    }

    /// Checks whether a route request is outstanding.
    pub fn is_route_request_pending(&self) -> bool {
        self.requests.pending_kind().is_some()
    }

    /// Applies the result of the outstanding route request, if it has finished.
    /// Returns true if a result was applied.
    pub fn poll_route_request(&mut self) -> bool {
        match self.requests.try_complete() {
            Some(f) => {
                self.finish_request(f);
                true
            }
            None => false,
        }
    }

    /// Blocks until the outstanding route request finishes, and applies its result.
    /// Returns false if no request was outstanding.
    pub fn wait_for_route_request(&mut self) -> bool {
        match self.requests.wait_complete() {
            Some(f) => {
                self.finish_request(f);
                true
            }
            None => false,
        }
    }

    /// Cancels the outstanding route request; its callback receives [Error::Cancel].
    pub fn cancel_route_request(&mut self) {
        if self.requests.cancel() == Some(RequestKind::Reroute)
            && self.state == NavigationState::OffRoute
        {
            self.set_state(NavigationState::ReRouteNeeded);
        }
    }

    fn finish_request(&mut self, f: Finished) {
        let Finished {
            id,
            kind,
            waypoints,
            callback,
            result,
        } = f;

        let outcome = match (kind, result) {
            (RequestKind::External, Ok(route)) => {
                self.use_route(route, waypoints);
                Ok(())
            }
            (RequestKind::Reroute, Ok(route)) => {
                self.use_rerouted(route, waypoints);
                Ok(())
            }
            (RequestKind::External, Err(e)) => {
                warn!("route request {:?} failed: {}", id, e);
                Err(e)
            }
            (RequestKind::Reroute, Err(e)) => {
                warn!("re-route failed: {}", e);
                if self.state != NavigationState::None {
                    self.set_state(NavigationState::ReRouteNeeded);
                }
                Err(e)
            }
        };

        if let Some(callback) = callback {
            match outcome {
                Ok(()) => callback(self.route.as_ref().ok_or(Error::NoRoute)),
                Err(e) => callback(Err(e)),
            }
        }
    }

    /// Requests a new route from the last position to the remaining waypoints,
    /// replacing any outstanding request. The state is [NavigationState::ReRouteDone]
    /// once the route is installed.
    pub fn reroute(&mut self) -> Result<RequestId, Error> {
        let router = self.router()?;
        let (Some(route), Some(fix)) = (self.route.as_ref(), self.last_fix) else {
            return Err(Error::NotNavigating);
        };

        let section = self
            .nearest
            .and_then(|n| route.segments.get(n.segment_index))
            .map_or(0, |s| s.section.max(0) as usize);

        let mut waypoints = vec![RoutePoint {
            point: fix.position,
            heading: fix
                .validity
                .contains(NavigationValidity::COURSE)
                .then_some(fix.course),
            ..Default::default()
        }];
        if self.waypoints.len() > section + 1 {
            waypoints.extend_from_slice(&self.waypoints[section + 1..]);
        } else {
            waypoints.extend(route.end_point().map(RoutePoint::new));
        }

        let request = Request {
            router,
            profile: route.profile.clone(),
            waypoints,
            kind: RequestKind::Reroute,
            callback: None,
        };
        self.requests.submit(request, true)
    }

    /// Removes the route and cancels any outstanding request.
    pub fn end_navigation(&mut self) {
        self.requests.cancel();
        self.reset_position();
        self.waypoints.clear();
        if self.route.take().is_some() {
            info!("navigation ended");
            self.observers.notify_route(None);
        }
        self.set_state(NavigationState::None);
    }

    /// Enables or disables navigation. A disabled navigator keeps its route,
    /// but stays in [NavigationState::None]; re-enabling it waits for a new position.
    pub fn enable_navigation(&mut self, enabled: bool) {
        if enabled == self.param.navigation_enabled {
            return;
        }
        self.param.navigation_enabled = enabled;

        if !enabled {
            self.set_state(NavigationState::None);
        } else if self.route.is_some() {
            self.reset_position();
            self.set_state(NavigationState::NoPosition);
        }
    }

    /// Reverses the current route, so that it leads back to its start.
    pub fn reverse_route(&mut self) -> Result<(), Error> {
        let mut route = self.route.clone().ok_or(Error::NotNavigating)?;
        route.reverse();
        let mut waypoints = self.waypoints.clone();
        waypoints.reverse();
        self.use_route(route, waypoints);
        return Ok(());
    }

    fn match_position(&self, route: &Route, p: Point) -> Option<NearestSegmentInfo> {
        let section = self
            .nearest
            .and_then(|n| route.segments.get(n.segment_index))
            .map(|s| s.section);
        let previous_distance = self.nearest.map_or(0.0, |n| n.distance_along_route);

        route
            .nearest_segment(p, section, previous_distance)
            .filter(|n| n.distance_to_route <= self.param.route_distance_tolerance)
    }

    /// Processes a position fix, returning the new state.
    ///
    /// Finished route requests are applied first. Fixes closer than
    /// [NavigatorParam::minimum_fix_distance] to the last accepted one are ignored.
    pub fn navigate(&mut self, fix: NavigationData) -> Result<NavigationState, Error> {
        self.poll_route_request();

        if !fix.validity.contains(NavigationValidity::POSITION)
            || !fix.position.x.is_finite()
            || !fix.position.y.is_finite()
        {
            warn!("rejected fix without a valid position");
            return Err(Error::InvalidArgument("fix has no valid position".to_string()));
        }

        let Some(route) = self.route.as_ref() else {
            return Ok(self.state);
        };
        if self.state == NavigationState::None {
            return Ok(self.state);
        }

        let Some((fix, travelled, elapsed)) = self.accept_fix(route, fix) else {
            return Ok(self.state);
        };

        let on_route = self.match_position(route, fix.position).map(|info| {
            let remaining = route.distance - info.distance_along_route;
            let wrong_way = fix.validity.contains(NavigationValidity::COURSE)
                && wrap_degrees(fix.course - info.heading).abs() > TURN_ROUND_ANGLE;

            if remaining < ARRIVAL_DISTANCE {
                (info, NavigationState::Arrival, TurnWindow::arrival(route, &info))
            } else if wrong_way {
                (
                    info,
                    NavigationState::TurnRound,
                    TurnWindow::turn_round(route, &info, fix.position, fix.course),
                )
            } else {
                (info, NavigationState::Turn, TurnWindow::ahead(route, &info))
            }
        });

        self.last_fix = Some(fix);
        match on_route {
            Some((info, state, window)) => {
                if self.requests.pending_kind() == Some(RequestKind::Reroute) {
                    debug!("back on route, dropping the re-route request");
                    self.requests.cancel();
                }
                self.nearest = Some(info);
                self.off_route = OffRoute::default();
                self.set_turns(window);
                self.set_state(state);
            }

            None => match self.state {
                NavigationState::OffRoute => {
                    self.off_route.time += elapsed;
                    self.off_route.distance += travelled;
                    self.check_reroute_needed();
                }
                NavigationState::ReRouteNeeded => {}
                _ => {
                    self.off_route = OffRoute::default();
                    self.set_state(NavigationState::OffRoute);
                }
            },
        }

        return Ok(self.state);
    }

    /// Fills in the missing time and course of a fix, returning it together with
    /// the distance travelled (in metres) and the time elapsed since the last
    /// accepted fix. Returns [None] if the fix is too close to the last one.
    fn accept_fix(&self, route: &Route, mut fix: NavigationData) -> Option<(NavigationData, f64, f64)> {
        if !fix.validity.contains(NavigationValidity::TIME) {
            fix.time = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0.0, |d| d.as_secs_f64());
            fix.validity |= NavigationValidity::TIME;
        }

        let Some(last) = self.last_fix else {
            return Some((fix, 0.0, 0.0));
        };

        let travelled = last.position.distance(fix.position) * route.point_scale;
        if travelled < self.param.minimum_fix_distance {
            return None;
        }

        if !fix.validity.contains(NavigationValidity::COURSE) {
            if let Some(course) = last.position.direction_to(fix.position) {
                fix.course = course;
                fix.validity |= NavigationValidity::COURSE;
            }
        }

        return Some((fix, travelled, (fix.time - last.time).max(0.0)));
    }

    fn check_reroute_needed(&mut self) {
        let exceeded = self.off_route.time > self.param.route_time_tolerance
            || self.off_route.distance
                > OFF_ROUTE_DISTANCE_FACTOR * self.param.route_distance_tolerance;
        if !exceeded || self.requests.pending_kind() == Some(RequestKind::Reroute) {
            return;
        }

        if !self.param.auto_reroute || self.router.is_none() {
            self.set_state(NavigationState::ReRouteNeeded);
            return;
        }

        match self.reroute() {
            Ok(id) => debug!("off route, re-routing with request {:?}", id),
            Err(e) => {
                warn!("can't re-route: {}", e);
                self.set_state(NavigationState::ReRouteNeeded);
            }
        }
    }

    fn require_navigating(&self) -> Result<(), Error> {
        match self.state {
            NavigationState::None | NavigationState::NoPosition => Err(Error::NotNavigating),
            _ => Ok(()),
        }
    }

    fn window(&self) -> Result<&TurnWindow, Error> {
        self.require_navigating()?;
        self.turns.as_ref().ok_or(Error::NotNavigating)
    }

    /// Returns the next turn to take.
    pub fn first_turn(&self) -> Result<&NavigatorTurn, Error> {
        self.window().map(|w| &w.first)
    }

    /// Returns the turn following shortly after the [first](Navigator::first_turn).
    pub fn second_turn(&self) -> Result<Option<&NavigatorTurn>, Error> {
        self.window().map(|w| w.second.as_ref())
    }

    /// Returns the straight-on junction before the [first turn](Navigator::first_turn), if any.
    pub fn continuation_turn(&self) -> Result<Option<&NavigatorTurn>, Error> {
        self.window().map(|w| w.continuation.as_ref())
    }

    /// Returns the instructions for the first turn.
    pub fn turn_instructions(&mut self) -> Result<String, Error> {
        self.require_navigating()?;
        let profile = &self.route.as_ref().ok_or(Error::NotNavigating)?.profile;
        let window = self.turns.as_mut().ok_or(Error::NotNavigating)?;
        let text = window.first.create_instructions(
            self.instructions.as_ref(),
            profile,
            &self.locale,
            self.metric_units,
            self.abbreviate,
        );
        return Ok(text.to_string());
    }

    /// Returns the position on the route nearest to the last fix.
    pub fn nearest_segment(&self) -> Result<NearestSegmentInfo, Error> {
        self.require_navigating()?;
        self.nearest.ok_or(Error::NotNavigating)
    }

    pub fn current_segment(&self) -> Result<&RouteSegment, Error> {
        let info = self.nearest_segment()?;
        self.route
            .as_ref()
            .and_then(|r| r.segments.get(info.segment_index))
            .ok_or(Error::NotNavigating)
    }

    pub fn next_segment(&self) -> Result<Option<&RouteSegment>, Error> {
        let info = self.nearest_segment()?;
        let route = self.route.as_ref().ok_or(Error::NotNavigating)?;
        Ok(route.segments.get(info.segment_index + 1))
    }

    /// Returns the last accepted position.
    pub fn position(&self) -> Result<Point, Error> {
        self.require_navigating()?;
        self.last_fix.map(|f| f.position).ok_or(Error::NotNavigating)
    }

    /// Returns the length (in metres) of the route ahead.
    pub fn distance_to_destination(&self) -> Result<f64, Error> {
        let info = self.nearest_segment()?;
        let route = self.route.as_ref().ok_or(Error::NotNavigating)?;
        Ok((route.distance - info.distance_along_route).max(0.0))
    }

    /// Returns the travel time (in seconds) of the route ahead.
    pub fn time_to_destination(&self) -> Result<f64, Error> {
        let info = self.nearest_segment()?;
        let route = self.route.as_ref().ok_or(Error::NotNavigating)?;
        Ok((route.time - info.time_along_route).max(0.0))
    }
}

/// The start of a route followed by the end of every section.
fn waypoints_of(route: &Route) -> Vec<RoutePoint> {
    route
        .start_point()
        .into_iter()
        .chain(route.section_end_points())
        .map(RoutePoint::new)
        .collect()
}
