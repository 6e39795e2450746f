use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::plan::Plan;

/// Rest applied whenever a set is marked complete
pub const DEFAULT_REST_SECS: i64 = 60;

/// Contract violations by the caller driving a session
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("no set {set} in exercise {exercise}")]
    IndexOutOfRange { exercise: usize, set: usize },

    #[error("session already finished")]
    SessionAlreadyFinished,
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Which achieved value an edit overwrites
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SetField {
    Reps,
    Load,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetState {
    pub target_reps: u32,
    pub target_load: f64,
    pub completed: bool,
    pub reps: u32,
    pub load: f64,
}

impl SetState {
    pub fn volume(&self) -> f64 {
        self.load * self.reps as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseState {
    pub name: String,
    pub sets: Vec<SetState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestState {
    pub remaining_secs: i64,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoggedSet {
    pub reps: u32,
    pub load: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedExercise {
    pub name: String,
    pub sets: Vec<LoggedSet>,
}

/// Summary of a finished session, handed to a log sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    pub plan_id: String,
    pub title: String,
    pub duration_secs: u64,
    pub completed_at: DateTime<Local>,
    pub exercises: Vec<LoggedExercise>,
    pub total_volume: f64,
}

impl SessionLog {
    pub fn completed_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Open,
    Finished(SessionLog),
}

/// Drives one workout attempt from start to finish.
///
/// Elapsed time is derived from the clock on every tick; the rest countdown
/// is decremented by exactly one second per tick and is otherwise independent
/// of the wall clock.
#[derive(Debug)]
pub struct SessionRunner<C: Clock> {
    plan: Plan,
    clock: C,
    started_at: DateTime<Local>,
    elapsed_secs: u64,
    exercises: Vec<ExerciseState>,
    rest: Option<RestState>,
    phase: Phase,
}

impl<C: Clock> SessionRunner<C> {
    pub fn start(plan: Plan, clock: C) -> Self {
        let exercises = plan
            .exercises
            .iter()
            .map(|ex| ExerciseState {
                name: ex.name.clone(),
                sets: ex
                    .sets
                    .iter()
                    .map(|s| SetState {
                        target_reps: s.reps,
                        target_load: s.load,
                        completed: false,
                        reps: s.reps,
                        load: s.load,
                    })
                    .collect(),
            })
            .collect();

        let started_at = clock.now();
        info!(plan = %plan.id, sets = plan.total_sets(), "session started");

        Self {
            plan,
            clock,
            started_at,
            elapsed_secs: 0,
            exercises,
            rest: None,
            phase: Phase::Open,
        }
    }

    /// One logical second has passed
    pub fn tick(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        self.refresh_elapsed();

        if let Some(rest) = self.rest.as_mut() {
            if rest.active {
                rest.remaining_secs -= 1;
                if rest.remaining_secs <= 0 {
                    debug!("rest finished");
                    self.rest = None;
                }
            }
        }
        Ok(())
    }

    pub fn edit_set(
        &mut self,
        exercise: usize,
        set: usize,
        field: SetField,
        value: f64,
    ) -> SessionResult<()> {
        self.ensure_open()?;
        let state = self.set_mut(exercise, set)?;
        match field {
            // float to int casts saturate and map NaN to zero
            SetField::Reps => state.reps = value.round() as u32,
            SetField::Load => state.load = if value.is_finite() { value } else { 0.0 },
        }
        debug!(exercise, set, %field, value, "set edited");
        Ok(())
    }

    /// Flips completion and returns the new flag. Completing a set restarts
    /// the rest countdown, replacing any countdown already running.
    pub fn toggle_set(&mut self, exercise: usize, set: usize) -> SessionResult<bool> {
        self.ensure_open()?;
        let state = self.set_mut(exercise, set)?;
        state.completed = !state.completed;
        let completed = state.completed;

        if completed {
            self.rest = Some(RestState {
                remaining_secs: DEFAULT_REST_SECS,
                active: true,
            });
        }
        debug!(exercise, set, completed, "set toggled");
        Ok(completed)
    }

    pub fn extend_rest(&mut self, delta_secs: i64) -> SessionResult<()> {
        self.ensure_open()?;
        if let Some(rest) = self.rest.as_mut().filter(|r| r.active) {
            rest.remaining_secs = rest.remaining_secs.saturating_add(delta_secs);
            if rest.remaining_secs <= 0 {
                self.rest = None;
            }
        }
        Ok(())
    }

    pub fn skip_rest(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        self.rest = None;
        Ok(())
    }

    /// Closes the session and produces its log. Only completed sets count.
    pub fn finish(&mut self) -> SessionResult<SessionLog> {
        self.ensure_open()?;
        self.refresh_elapsed();

        let exercises: Vec<LoggedExercise> = self
            .exercises
            .iter()
            .map(|ex| LoggedExercise {
                name: ex.name.clone(),
                sets: ex
                    .sets
                    .iter()
                    .filter(|s| s.completed)
                    .map(|s| LoggedSet {
                        reps: s.reps,
                        load: s.load,
                    })
                    .collect(),
            })
            .collect();

        let log = SessionLog {
            plan_id: self.plan.id.clone(),
            title: self.plan.title.clone(),
            duration_secs: self.elapsed_secs,
            completed_at: self.clock.now(),
            total_volume: self.running_volume(),
            exercises,
        };

        info!(
            plan = %log.plan_id,
            duration = log.duration_secs,
            sets = log.completed_sets(),
            volume = log.total_volume,
            "session finished"
        );

        self.rest = None;
        self.phase = Phase::Finished(log.clone());
        Ok(log)
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn exercises(&self) -> &[ExerciseState] {
        &self.exercises
    }

    pub fn rest(&self) -> Option<RestState> {
        self.rest
    }

    pub fn is_resting(&self) -> bool {
        self.rest.is_some_and(|r| r.active)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished(_))
    }

    /// The log produced by `finish`, if the session has finished
    pub fn log(&self) -> Option<&SessionLog> {
        match &self.phase {
            Phase::Finished(log) => Some(log),
            Phase::Open => None,
        }
    }

    pub fn completed_sets(&self) -> usize {
        self.completed().count()
    }

    pub fn total_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }

    /// Volume of the sets completed so far
    pub fn running_volume(&self) -> f64 {
        self.completed().map(SetState::volume).sum()
    }

    fn completed(&self) -> impl Iterator<Item = &SetState> {
        self.exercises
            .iter()
            .flat_map(|e| e.sets.iter())
            .filter(|s| s.completed)
    }

    fn ensure_open(&self) -> SessionResult<()> {
        match self.phase {
            Phase::Open => Ok(()),
            Phase::Finished(_) => Err(SessionError::SessionAlreadyFinished),
        }
    }

    fn refresh_elapsed(&mut self) {
        let secs = (self.clock.now() - self.started_at).num_seconds().max(0) as u64;
        self.elapsed_secs = self.elapsed_secs.max(secs);
    }

    fn set_mut(&mut self, exercise: usize, set: usize) -> SessionResult<&mut SetState> {
        self.exercises
            .get_mut(exercise)
            .and_then(|e| e.sets.get_mut(set))
            .ok_or(SessionError::IndexOutOfRange { exercise, set })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::plan::{PrescribedExercise, PrescribedSet};
    use assert_matches::assert_matches;

    fn leg_day() -> Plan {
        Plan {
            id: "leg-day".into(),
            title: "Leg Day".into(),
            exercises: vec![PrescribedExercise {
                name: "Squat".into(),
                sets: vec![
                    PrescribedSet { reps: 10, load: 60.0 },
                    PrescribedSet { reps: 10, load: 60.0 },
                ],
            }],
        }
    }

    fn two_exercises() -> Plan {
        let mut plan = leg_day();
        plan.exercises.push(PrescribedExercise {
            name: "Lunge".into(),
            sets: vec![PrescribedSet { reps: 12, load: 20.0 }],
        });
        plan
    }

    fn runner(plan: Plan) -> (SessionRunner<ManualClock>, ManualClock) {
        let clock = ManualClock::default();
        (SessionRunner::start(plan, clock.clone()), clock)
    }

    #[test]
    fn start_mirrors_plan() {
        let (session, _) = runner(two_exercises());

        assert_eq!(session.exercises().len(), 2);
        assert_eq!(session.exercises()[0].sets.len(), 2);
        assert_eq!(session.exercises()[1].name, "Lunge");
        assert_eq!(session.total_sets(), 3);
        assert_eq!(session.completed_sets(), 0);
        assert!(session.rest().is_none());
        assert!(!session.is_finished());

        let set = &session.exercises()[1].sets[0];
        assert_eq!((set.reps, set.load), (12, 20.0));
        assert_eq!((set.target_reps, set.target_load), (12, 20.0));
        assert!(!set.completed);
    }

    #[test]
    fn immediate_finish_is_empty() {
        let (mut session, _) = runner(leg_day());
        let log = session.finish().unwrap();

        assert_eq!(log.duration_secs, 0);
        assert_eq!(log.completed_sets(), 0);
        assert_eq!(log.total_volume, 0.0);
        assert_eq!(log.exercises.len(), 1);
        assert!(log.exercises[0].sets.is_empty());
    }

    #[test]
    fn empty_plan_finishes_cleanly() {
        let plan = Plan {
            id: "empty".into(),
            title: "Nothing".into(),
            exercises: vec![],
        };
        let (mut session, clock) = runner(plan);
        clock.advance_secs(5);
        session.tick().unwrap();

        let log = session.finish().unwrap();
        assert_eq!(log.duration_secs, 5);
        assert!(log.exercises.is_empty());
        assert_eq!(log.total_volume, 0.0);
    }

    #[test]
    fn tick_tracks_wall_clock() {
        let (mut session, clock) = runner(leg_day());

        clock.advance_secs(3);
        session.tick().unwrap();
        assert_eq!(session.elapsed_secs(), 3);

        clock.advance_secs(120);
        session.tick().unwrap();
        assert_eq!(session.elapsed_secs(), 123);
    }

    #[test]
    fn elapsed_never_decreases() {
        let (mut session, clock) = runner(leg_day());
        clock.advance_secs(10);
        session.tick().unwrap();

        clock.advance_secs(-8);
        session.tick().unwrap();
        assert_eq!(session.elapsed_secs(), 10);
    }

    #[test]
    fn completing_a_set_starts_rest() {
        let (mut session, _) = runner(leg_day());

        assert!(session.toggle_set(0, 0).unwrap());
        assert_eq!(
            session.rest(),
            Some(RestState {
                remaining_secs: DEFAULT_REST_SECS,
                active: true
            })
        );
        assert!(session.is_resting());
    }

    #[test]
    fn new_completion_restarts_running_rest() {
        let (mut session, _) = runner(leg_day());
        session.toggle_set(0, 0).unwrap();
        for _ in 0..45 {
            session.tick().unwrap();
        }
        assert_eq!(session.rest().unwrap().remaining_secs, 15);

        session.toggle_set(0, 1).unwrap();
        assert_eq!(session.rest().unwrap().remaining_secs, 60);
    }

    #[test]
    fn uncompleting_leaves_rest_alone() {
        let (mut session, _) = runner(leg_day());
        session.toggle_set(0, 0).unwrap();
        session.tick().unwrap();
        session.tick().unwrap();

        assert!(!session.toggle_set(0, 0).unwrap());
        assert_eq!(session.rest().unwrap().remaining_secs, 58);
        assert_eq!(session.completed_sets(), 0);
    }

    #[test]
    fn uncompleting_without_rest_does_not_start_one() {
        let (mut session, _) = runner(leg_day());
        session.toggle_set(0, 0).unwrap();
        session.skip_rest().unwrap();

        session.toggle_set(0, 0).unwrap();
        assert!(session.rest().is_none());
    }

    #[test]
    fn rest_runs_out_after_sixty_ticks() {
        let (mut session, _) = runner(leg_day());
        session.toggle_set(0, 0).unwrap();

        for _ in 0..59 {
            session.tick().unwrap();
        }
        assert_eq!(session.rest().unwrap().remaining_secs, 1);

        session.tick().unwrap();
        assert!(session.rest().is_none());

        session.tick().unwrap();
        assert!(session.rest().is_none());
    }

    #[test]
    fn extend_rest_adds_time() {
        let (mut session, _) = runner(leg_day());
        session.toggle_set(0, 0).unwrap();
        session.tick().unwrap();

        session.extend_rest(30).unwrap();
        assert_eq!(session.rest().unwrap().remaining_secs, 89);
    }

    #[test]
    fn extend_rest_without_rest_is_noop() {
        let (mut session, _) = runner(leg_day());
        session.extend_rest(30).unwrap();
        assert!(session.rest().is_none());
    }

    #[test]
    fn shortening_rest_to_zero_clears_it() {
        let (mut session, _) = runner(leg_day());
        session.toggle_set(0, 0).unwrap();

        session.extend_rest(-30).unwrap();
        assert_eq!(session.rest().unwrap().remaining_secs, 30);

        session.extend_rest(-45).unwrap();
        assert!(session.rest().is_none());
    }

    #[test]
    fn skip_rest_clears_countdown() {
        let (mut session, _) = runner(leg_day());
        session.toggle_set(0, 0).unwrap();
        session.skip_rest().unwrap();
        assert!(session.rest().is_none());
        assert!(!session.is_resting());
    }

    #[test]
    fn edit_set_overwrites_achieved_values() {
        let (mut session, _) = runner(leg_day());
        session.edit_set(0, 1, SetField::Load, 62.5).unwrap();
        session.edit_set(0, 1, SetField::Reps, 8.0).unwrap();

        let set = &session.exercises()[0].sets[1];
        assert_eq!((set.reps, set.load), (8, 62.5));
        assert_eq!((set.target_reps, set.target_load), (10, 60.0));
    }

    #[test]
    fn edit_set_coerces_numbers() {
        let (mut session, _) = runner(leg_day());
        session.edit_set(0, 0, SetField::Reps, -4.0).unwrap();
        session.edit_set(0, 1, SetField::Reps, 7.6).unwrap();
        session.edit_set(0, 1, SetField::Load, f64::NAN).unwrap();

        assert_eq!(session.exercises()[0].sets[0].reps, 0);
        assert_eq!(session.exercises()[0].sets[1].reps, 8);
        assert_eq!(session.exercises()[0].sets[1].load, 0.0);
    }

    #[test]
    fn out_of_range_indices_fail() {
        let (mut session, _) = runner(leg_day());

        assert_matches!(
            session.toggle_set(0, 2),
            Err(SessionError::IndexOutOfRange { exercise: 0, set: 2 })
        );
        assert_matches!(
            session.edit_set(3, 0, SetField::Reps, 1.0),
            Err(SessionError::IndexOutOfRange { exercise: 3, set: 0 })
        );
        assert!(session.rest().is_none());
    }

    #[test]
    fn volume_counts_only_completed_sets() {
        let (mut session, clock) = runner(two_exercises());
        session.toggle_set(0, 0).unwrap();
        session.edit_set(0, 0, SetField::Load, 70.0).unwrap();
        // edited but never completed
        session.edit_set(0, 1, SetField::Load, 500.0).unwrap();
        session.toggle_set(1, 0).unwrap();
        clock.advance_secs(42);

        let log = session.finish().unwrap();
        assert_eq!(log.total_volume, 70.0 * 10.0 + 20.0 * 12.0);
        assert_eq!(log.completed_sets(), 2);
        assert_eq!(log.exercises[0].sets, vec![LoggedSet { reps: 10, load: 70.0 }]);
        assert_eq!(log.duration_secs, 42);
    }

    #[test]
    fn leg_day_example() {
        let (mut session, clock) = runner(leg_day());
        session.toggle_set(0, 0).unwrap();
        clock.advance_secs(300);
        session.tick().unwrap();

        let log = session.finish().unwrap();
        assert_eq!(log.plan_id, "leg-day");
        assert_eq!(log.title, "Leg Day");
        assert_eq!(log.duration_secs, 300);
        assert_eq!(
            log.exercises,
            vec![LoggedExercise {
                name: "Squat".into(),
                sets: vec![LoggedSet { reps: 10, load: 60.0 }],
            }]
        );
        assert_eq!(log.total_volume, 600.0);
        assert_eq!(log.completed_at, clock.now());
    }

    #[test]
    fn finished_session_rejects_everything() {
        let (mut session, clock) = runner(leg_day());
        session.toggle_set(0, 0).unwrap();
        let log = session.finish().unwrap();
        clock.advance_secs(100);

        let finished = Err(SessionError::SessionAlreadyFinished);
        assert_eq!(session.tick(), finished);
        assert_eq!(session.toggle_set(0, 1).map(|_| ()), finished);
        assert_eq!(session.edit_set(0, 0, SetField::Reps, 1.0), finished);
        assert_eq!(session.extend_rest(30), finished);
        assert_eq!(session.skip_rest(), finished);
        assert_matches!(session.finish(), Err(SessionError::SessionAlreadyFinished));

        assert_eq!(session.log(), Some(&log));
        assert_eq!(session.elapsed_secs(), 0);
        assert!(session.is_finished());
    }

    #[test]
    fn finish_clears_rest() {
        let (mut session, _) = runner(leg_day());
        session.toggle_set(0, 0).unwrap();
        session.finish().unwrap();
        assert!(session.rest().is_none());
    }

    #[test]
    fn log_serializes_to_json() {
        let (mut session, _) = runner(leg_day());
        session.toggle_set(0, 1).unwrap();
        let log = session.finish().unwrap();

        let json = serde_json::to_string(&log).unwrap();
        let back: SessionLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back.exercises, log.exercises);
        assert_eq!(back.total_volume, 600.0);
    }
}
