use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use trace_core::catalog::ShapeCatalog;
use trace_core::model::{Point, Shape, ShapeName, UserId};

use super::plan::TracePlan;
use super::service::TraceSession;
use crate::error::SessionError;

/// Concurrent map from user id to tracing session.
///
/// Lookup is read-mostly; each session sits behind its own mutex so frames
/// for the same user serialize while distinct users never contend. Sessions
/// live for the whole process; there is no eviction.
pub struct SessionRegistry {
    catalog: Arc<ShapeCatalog>,
    sessions: RwLock<HashMap<UserId, Arc<Mutex<TraceSession>>>>,
    rng: Mutex<StdRng>,
}

impl SessionRegistry {
    /// Registry with an OS-seeded rng for shape rolls.
    #[must_use]
    pub fn new(catalog: Arc<ShapeCatalog>) -> Self {
        Self::with_rng(catalog, StdRng::from_os_rng())
    }

    /// Registry with a deterministic rng, for tests.
    #[must_use]
    pub fn with_seed(catalog: Arc<ShapeCatalog>, seed: u64) -> Self {
        Self::with_rng(catalog, StdRng::seed_from_u64(seed))
    }

    fn with_rng(catalog: Arc<ShapeCatalog>, rng: StdRng) -> Self {
        Self {
            catalog,
            sessions: RwLock::new(HashMap::new()),
            rng: Mutex::new(rng),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &ShapeCatalog {
        &self.catalog
    }

    /// Number of sessions created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn roll_shape(&self) -> Arc<Shape> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let name = self
            .catalog
            .names()
            .choose(&mut *rng)
            .expect("catalog construction rejects the empty case");
        self.catalog
            .get(name)
            .expect("names are drawn from the catalog itself")
    }

    /// Fetch the session for a user, if one exists.
    #[must_use]
    pub fn get(&self, user: &UserId) -> Option<Arc<Mutex<TraceSession>>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user)
            .cloned()
    }

    /// Fetch or create the session for a user.
    ///
    /// A new session starts unsampled on a randomly rolled shape.
    #[must_use]
    pub fn get_or_create(&self, user: &UserId) -> Arc<Mutex<TraceSession>> {
        if let Some(session) = self.get(user) {
            return session;
        }

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        // another writer may have won the race between our read and write
        Arc::clone(
            sessions
                .entry(user.clone())
                .or_insert_with(|| Arc::new(Mutex::new(TraceSession::new(self.roll_shape())))),
        )
    }

    /// Feed one fingertip sample (or absence) to a user's session.
    pub fn advance(&self, user: &UserId, fingertip: Option<Point>) -> TracePlan {
        let session = self.get_or_create(user);
        let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
        session.advance(fingertip)
    }

    /// Reset a user's session, creating it if absent.
    ///
    /// Binds the named shape when given, otherwise rolls a random one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Catalog` if an explicit shape name is unknown.
    pub fn reset(
        &self,
        user: &UserId,
        shape: Option<&ShapeName>,
    ) -> Result<TracePlan, SessionError> {
        let shape = match shape {
            Some(name) => self.catalog.get(name)?,
            None => self.roll_shape(),
        };

        let session = self.get_or_create(user);
        let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
        session.reset(shape);
        Ok(session.plan(None))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use trace_core::catalog::CatalogError;

    fn registry() -> SessionRegistry {
        SessionRegistry::with_seed(Arc::new(ShapeCatalog::builtin()), 7)
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn first_sample_creates_a_session() {
        let registry = registry();
        assert!(registry.is_empty());

        let plan = registry.advance(&user("alice"), None);
        assert_eq!(plan.progress, 0);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&user("alice")).is_some());
        assert!(registry.get(&user("bob")).is_none());
    }

    #[test]
    fn sessions_are_isolated_per_user() {
        let registry = registry();
        let square = ShapeName::new("square").unwrap();

        registry.reset(&user("alice"), Some(&square)).unwrap();
        registry.reset(&user("bob"), Some(&square)).unwrap();

        // alice reaches the first corner; bob stays put
        let plan = registry.advance(&user("alice"), Some(Point::new(200, 120)));
        assert_eq!(plan.progress, 1);

        let plan = registry.advance(&user("bob"), None);
        assert_eq!(plan.progress, 0);
    }

    #[test]
    fn seeded_registries_roll_identical_shapes() {
        let a = SessionRegistry::with_seed(Arc::new(ShapeCatalog::builtin()), 42);
        let b = SessionRegistry::with_seed(Arc::new(ShapeCatalog::builtin()), 42);

        for i in 0..10 {
            let id = user(&format!("user-{i}"));
            let plan_a = a.advance(&id, None);
            let plan_b = b.advance(&id, None);
            assert_eq!(plan_a.shape_name, plan_b.shape_name);
        }
    }

    #[test]
    fn reset_with_explicit_shape_binds_it() {
        let registry = registry();
        let star = ShapeName::new("star").unwrap();

        let plan = registry.reset(&user("alice"), Some(&star)).unwrap();
        assert_eq!(plan.shape_name, star);
        assert_eq!(plan.progress, 0);
        assert_eq!(plan.total, 5);
    }

    #[test]
    fn reset_with_unknown_shape_fails() {
        let registry = registry();
        let err = registry
            .reset(&user("alice"), Some(&ShapeName::new("heptagon").unwrap()))
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Catalog(CatalogError::UnknownShape(_))
        ));
    }

    #[test]
    fn reset_mid_trace_zeroes_progress() {
        let registry = registry();
        let square = ShapeName::new("square").unwrap();
        registry.reset(&user("alice"), Some(&square)).unwrap();
        registry.advance(&user("alice"), Some(Point::new(200, 120)));

        let plan = registry.reset(&user("alice"), None).unwrap();
        assert_eq!(plan.progress, 0);
        assert!(!plan.completed);
    }

    #[test]
    fn get_or_create_returns_the_same_session() {
        let registry = registry();
        let first = registry.get_or_create(&user("alice"));
        let second = registry.get_or_create(&user("alice"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }
}
