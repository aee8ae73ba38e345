// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use log::{debug, error};

use crate::profile::Profile;
use crate::route::{Route, RouteBuilder};
use crate::{CancellationToken, Error, RoutePoint, Router};

/// Called once with the outcome of an asynchronous route request: the installed
/// route, or the reason it failed ([Error::Cancel] if it was superseded).
pub type RouteCallback = Box<dyn FnOnce(Result<&Route, Error>) + Send>;

/// Identifies an asynchronous route request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestKind {
    /// Requested by the user; the result replaces the current route.
    External,

    /// Re-route from the current position to the remaining waypoints.
    Reroute,
}

pub(crate) struct Request {
    pub(crate) router: Arc<dyn Router>,
    pub(crate) profile: Profile,
    pub(crate) waypoints: Vec<RoutePoint>,
    pub(crate) kind: RequestKind,
    pub(crate) callback: Option<RouteCallback>,
}

struct Outstanding {
    id: RequestId,
    token: CancellationToken,
    kind: RequestKind,
    waypoints: Vec<RoutePoint>,
    callback: Option<RouteCallback>,
}

struct Completion {
    id: RequestId,
    result: Result<Route, Error>,
}

/// A request whose worker has finished.
pub(crate) struct Finished {
    pub(crate) id: RequestId,
    pub(crate) kind: RequestKind,
    pub(crate) waypoints: Vec<RoutePoint>,
    pub(crate) callback: Option<RouteCallback>,
    pub(crate) result: Result<Route, Error>,
}

/// Runs route requests on worker threads, at most one outstanding at a time.
///
/// Results are only picked up by [RouteRequests::try_complete] or
/// [RouteRequests::wait_complete]; results of superseded requests are discarded.
pub(crate) struct RouteRequests {
    next_id: u64,
    outstanding: Option<Outstanding>,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
}

impl Default for RouteRequests {
    fn default() -> Self {
        let (sender, receiver) = channel();
        Self {
            next_id: 0,
            outstanding: None,
            sender,
            receiver,
        }
    }
}

impl RouteRequests {
    pub(crate) fn pending_kind(&self) -> Option<RequestKind> {
        self.outstanding.as_ref().map(|o| o.kind)
    }

    /// Starts a worker for a request.
    ///
    /// If a request is already outstanding, fails with [Error::Busy], unless
    /// `override_outstanding` is set: then the outstanding request is cancelled,
    /// and its callback receives [Error::Cancel] before this function returns.
    pub(crate) fn submit(
        &mut self,
        request: Request,
        override_outstanding: bool,
    ) -> Result<RequestId, Error> {
        if self.outstanding.is_some() && !override_outstanding {
            return Err(Error::Busy);
        }
        self.cancel();

        self.next_id += 1;
        let id = RequestId(self.next_id);
        let token = CancellationToken::new();

        let Request {
            router,
            profile,
            waypoints,
            kind,
            callback,
        } = request;

        {
            let token = token.clone();
            let waypoints = waypoints.clone();
            let sender = self.sender.clone();

            thread::Builder::new()
                .name(format!("routenav-request-{}", id.0))
                .spawn(move || {
                    let result = catch_unwind(AssertUnwindSafe(|| {
                        let raw = router.find_route(&profile, &waypoints, false, &token)?;
                        token.check()?;
                        RouteBuilder::build(&profile, &raw)
                    }))
                    .unwrap_or_else(|_| {
                        error!("router panicked while handling request {}", id.0);
                        Err(Error::NoRoute)
                    });

                    if sender.send(Completion { id, result }).is_err() {
                        debug!("request {} finished after its navigator was dropped", id.0);
                    }
                })?;
        }

        debug!("started route request {} ({:?})", id.0, kind);
        self.outstanding = Some(Outstanding {
            id,
            token,
            kind,
            waypoints,
            callback,
        });
        return Ok(id);
    }

    /// Cancels the outstanding request, if any, calling its callback with
    /// [Error::Cancel]. Returns the kind of the cancelled request.
    pub(crate) fn cancel(&mut self) -> Option<RequestKind> {
        let o = self.outstanding.take()?;
        o.token.cancel();
        debug!("cancelled route request {}", o.id.0);
        if let Some(callback) = o.callback {
            callback(Err(Error::Cancel));
        }
        return Some(o.kind);
    }

    fn accept(&mut self, c: Completion) -> Option<Finished> {
        if self.outstanding.as_ref().map(|o| o.id) != Some(c.id) {
            debug!("discarding result of superseded request {}", c.id.0);
            return None;
        }

        let o = self.outstanding.take()?;
        debug!("route request {} finished", o.id.0);
        return Some(Finished {
            id: o.id,
            kind: o.kind,
            waypoints: o.waypoints,
            callback: o.callback,
            result: c.result,
        });
    }

    /// Picks up the outstanding request's result, without blocking.
    pub(crate) fn try_complete(&mut self) -> Option<Finished> {
        while let Ok(c) = self.receiver.try_recv() {
            if let Some(f) = self.accept(c) {
                return Some(f);
            }
        }
        return None;
    }

    /// Blocks until the outstanding request finishes, and returns its result.
    /// Returns [None] immediately if there's no outstanding request.
    pub(crate) fn wait_complete(&mut self) -> Option<Finished> {
        while self.outstanding.is_some() {
            let c = self.receiver.recv().ok()?;
            if let Some(f) = self.accept(c) {
                return Some(f);
            }
        }
        return None;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::geometry::Path;
    use crate::profile::RoadType;
    use crate::{RawEdge, RawRoute};

    /// Connects consecutive waypoints with straight roads.
    ///
    /// Requests with a waypoint left of the y axis block until cancelled,
    /// and requests with a waypoint below `y = -1000` fail.
    pub(crate) struct StraightRouter;

    impl Router for StraightRouter {
        fn find_route(
            &self,
            _profile: &Profile,
            waypoints: &[RoutePoint],
            _best_effort: bool,
            cancel: &CancellationToken,
        ) -> Result<RawRoute, Error> {
            if waypoints.iter().any(|w| w.point.x < 0.0) {
                loop {
                    cancel.check()?;
                    thread::sleep(Duration::from_millis(1));
                }
            }
            if waypoints.iter().any(|w| w.point.y < -1000.0) {
                return Err(Error::NoRouteConnectivity);
            }

            let edges = waypoints
                .windows(2)
                .enumerate()
                .map(|(i, w)| RawEdge {
                    path: Path::from_points(vec![w[0].point, w[1].point]),
                    road_type: RoadType::ResidentialRoad,
                    name: format!("Road {}", i),
                    section: i as i32,
                    ..Default::default()
                })
                .collect();
            return Ok(RawRoute {
                edges,
                ..Default::default()
            });
        }
    }

    pub(crate) fn request(points: &[(f64, f64)], callback: Option<RouteCallback>) -> Request {
        Request {
            router: Arc::new(StraightRouter),
            profile: Profile::default(),
            waypoints: points
                .iter()
                .map(|&(x, y)| RoutePoint::new(crate::Point::new(x, y)))
                .collect(),
            kind: RequestKind::External,
            callback,
        }
    }

    /// Returns a callback recording its outcome.
    pub(crate) fn recorder() -> (Arc<Mutex<Vec<String>>>, RouteCallback) {
        let log = Arc::new(Mutex::new(Vec::default()));
        let log_clone = Arc::clone(&log);
        let callback: RouteCallback = Box::new(move |r: Result<&Route, Error>| {
            let entry = match r {
                Ok(route) => format!("ok {}", route.segments.len()),
                Err(e) => format!("err {}", e),
            };
            log_clone.lock().unwrap().push(entry);
        });
        return (log, callback);
    }

    #[test]
    fn completes() {
        let mut r = RouteRequests::default();
        let id = r.submit(request(&[(0.0, 0.0), (100.0, 0.0)], None), false).unwrap();
        assert_eq!(r.pending_kind(), Some(RequestKind::External));

        let f = r.wait_complete().unwrap();
        assert_eq!(f.id, id);
        assert_eq!(f.result.unwrap().segments.len(), 1);
        assert_eq!(r.pending_kind(), None);
        assert!(r.wait_complete().is_none());
    }

    #[test]
    fn busy() {
        let mut r = RouteRequests::default();
        r.submit(request(&[(-1.0, 0.0), (100.0, 0.0)], None), false).unwrap();
        assert!(matches!(
            r.submit(request(&[(0.0, 0.0), (100.0, 0.0)], None), false),
            Err(Error::Busy)
        ));
        assert_eq!(r.cancel(), Some(RequestKind::External));
    }

    #[test]
    fn override_cancels_previous() {
        let mut r = RouteRequests::default();
        let (first_log, first_callback) = recorder();
        let first = r
            .submit(request(&[(-1.0, 0.0), (100.0, 0.0)], Some(first_callback)), false)
            .unwrap();

        let second = r
            .submit(request(&[(0.0, 0.0), (100.0, 0.0)], None), true)
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(*first_log.lock().unwrap(), vec!["err canceled".to_string()]);

        let f = r.wait_complete().unwrap();
        assert_eq!(f.id, second);
        assert!(f.result.is_ok());
    }

    #[test]
    fn failure_is_reported() {
        let mut r = RouteRequests::default();
        r.submit(request(&[(0.0, 0.0), (0.0, -2000.0)], None), false).unwrap();
        let f = r.wait_complete().unwrap();
        assert!(matches!(f.result, Err(Error::NoRouteConnectivity)));
    }
}
