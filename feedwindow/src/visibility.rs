use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::marker::PhantomData;

use crate::Bounds;

/// A change in a region's visibility.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition<K> {
    pub key: K,
    pub in_view: bool,
}

/// A source of per-region intersection signals.
///
/// This is the capability a host intersection primitive is adapted to. Observers report raw
/// `in_view` flips without debouncing; deduplicating exposures is the consumer's job.
pub trait VisibilityObserver<K> {
    /// Starts (or updates) observation of `key`. Observing an already observed key replaces its
    /// bounds and threshold but keeps its current `in_view` state.
    fn observe(&mut self, key: K, bounds: Bounds, threshold: f32);

    /// Stops observation of `key` and discards its pending transitions. Idempotent.
    fn unobserve(&mut self, key: &K);

    /// Updates the viewport rectangle. Observers driven by other means may ignore this.
    fn set_viewport(&mut self, viewport: Bounds);

    fn poll_transition(&mut self) -> Option<Transition<K>>;

    /// Drains pending transitions lazily.
    fn transitions(&mut self) -> Transitions<'_, Self, K>
    where
        Self: Sized,
    {
        Transitions {
            observer: self,
            _key: PhantomData,
        }
    }
}

/// Iterator returned by [`VisibilityObserver::transitions`].
pub struct Transitions<'a, O, K> {
    observer: &'a mut O,
    _key: PhantomData<fn() -> K>,
}

impl<O: VisibilityObserver<K>, K> Iterator for Transitions<'_, O, K> {
    type Item = Transition<K>;

    fn next(&mut self) -> Option<Self::Item> {
        self.observer.poll_transition()
    }
}

/// Returns whether `region` intersects `viewport` by at least `threshold` of its own area.
///
/// Regions that merely touch the viewport edge are out of view, even at threshold `0`. A
/// zero-area region is in view when its origin lies inside the viewport.
pub fn is_in_view(region: &Bounds, viewport: &Bounds, threshold: f32) -> bool {
    let area = region.area();
    if area == 0 {
        return viewport.contains_point(region.x, region.y);
    }
    let overlap = region.intersection_area(viewport);
    if overlap == 0 {
        return false;
    }
    overlap as f64 / area as f64 >= threshold as f64
}

#[derive(Clone, Debug)]
struct Region<K> {
    key: K,
    bounds: Bounds,
    threshold: f32,
    in_view: bool,
}

/// Computes visibility from region and viewport geometry.
#[derive(Clone, Debug)]
pub struct GeometryObserver<K> {
    regions: Vec<Region<K>>,
    viewport: Option<Bounds>,
    pending: VecDeque<Transition<K>>,
}

impl<K> Default for GeometryObserver<K> {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            viewport: None,
            pending: VecDeque::new(),
        }
    }
}

impl<K: PartialEq + Clone> GeometryObserver<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viewport(&self) -> Option<Bounds> {
        self.viewport
    }

    pub fn observed_len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_observed(&self, key: &K) -> bool {
        self.regions.iter().any(|r| &r.key == key)
    }

    fn evaluate(
        viewport: Option<Bounds>,
        region: &mut Region<K>,
        out: &mut VecDeque<Transition<K>>,
    ) {
        let now = viewport.is_some_and(|vp| is_in_view(&region.bounds, &vp, region.threshold));
        if now != region.in_view {
            region.in_view = now;
            out.push_back(Transition {
                key: region.key.clone(),
                in_view: now,
            });
        }
    }
}

impl<K: PartialEq + Clone> VisibilityObserver<K> for GeometryObserver<K> {
    fn observe(&mut self, key: K, bounds: Bounds, threshold: f32) {
        let viewport = self.viewport;
        let idx = match self.regions.iter().position(|r| r.key == key) {
            Some(idx) => {
                let region = &mut self.regions[idx];
                region.bounds = bounds;
                region.threshold = threshold;
                idx
            }
            None => {
                self.regions.push(Region {
                    key,
                    bounds,
                    threshold,
                    in_view: false,
                });
                self.regions.len() - 1
            }
        };
        Self::evaluate(viewport, &mut self.regions[idx], &mut self.pending);
    }

    fn unobserve(&mut self, key: &K) {
        self.regions.retain(|r| &r.key != key);
        self.pending.retain(|t| &t.key != key);
    }

    fn set_viewport(&mut self, viewport: Bounds) {
        if self.viewport == Some(viewport) {
            return;
        }
        self.viewport = Some(viewport);
        for region in &mut self.regions {
            Self::evaluate(Some(viewport), region, &mut self.pending);
        }
    }

    fn poll_transition(&mut self) -> Option<Transition<K>> {
        self.pending.pop_front()
    }
}

/// A manually driven observer for tests and hosts that compute intersections themselves.
///
/// Call [`ManualObserver::simulate`] to report a region's state. Geometry is recorded but
/// never evaluated.
#[derive(Clone, Debug)]
pub struct ManualObserver<K> {
    regions: Vec<(K, bool)>,
    pending: VecDeque<Transition<K>>,
}

impl<K> Default for ManualObserver<K> {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            pending: VecDeque::new(),
        }
    }
}

impl<K: PartialEq + Clone> ManualObserver<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_observed(&self, key: &K) -> bool {
        self.regions.iter().any(|(k, _)| k == key)
    }

    pub fn observed(&self) -> impl Iterator<Item = &K> {
        self.regions.iter().map(|(k, _)| k)
    }

    /// Reports that `key` is (or is not) intersecting. Unobserved keys and repeated states
    /// produce no transition. Returns whether a transition was queued.
    pub fn simulate(&mut self, key: &K, in_view: bool) -> bool {
        let Some((_, state)) = self.regions.iter_mut().find(|(k, _)| k == key) else {
            return false;
        };
        if *state == in_view {
            return false;
        }
        *state = in_view;
        self.pending.push_back(Transition {
            key: key.clone(),
            in_view,
        });
        true
    }
}

impl<K: PartialEq + Clone> VisibilityObserver<K> for ManualObserver<K> {
    fn observe(&mut self, key: K, _bounds: Bounds, _threshold: f32) {
        if !self.is_observed(&key) {
            self.regions.push((key, false));
        }
    }

    fn unobserve(&mut self, key: &K) {
        self.regions.retain(|(k, _)| k != key);
        self.pending.retain(|t| &t.key != key);
    }

    fn set_viewport(&mut self, _viewport: Bounds) {}

    fn poll_transition(&mut self) -> Option<Transition<K>> {
        self.pending.pop_front()
    }
}
