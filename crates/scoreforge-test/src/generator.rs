//! Seeded random schedules and moves.
//!
//! ```
//! use scoreforge_test::ScheduleGenerator;
//!
//! let a = ScheduleGenerator::new(7).schedule(3, 10);
//! let b = ScheduleGenerator::new(7).schedule(3, 10);
//! assert_eq!(a.shifts.len(), 10);
//! assert_eq!(
//!     a.solution.iter().map(|(_, f)| f.clone()).collect::<Vec<_>>(),
//!     b.solution.iter().map(|(_, f)| f.clone()).collect::<Vec<_>>(),
//! );
//! ```

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use scoreforge_core::{FactId, SolutionDescriptor, Value};

use crate::scheduling::{self, Schedule};

const SKILLS: [&str; 3] = ["nurse", "doctor", "cleaner"];
const DAYS: i64 = 3;
const MINUTES_PER_DAY: i64 = 24 * 60;

/// One change to a schedule, described without applying it.
#[derive(Debug, Clone, PartialEq)]
pub enum ShiftMove {
    /// Set a shift's assignee (`Value::None` unassigns it).
    Assign { shift: FactId, employee: Value },
    /// Move a shift to another time window.
    Reschedule {
        shift: FactId,
        day: i64,
        start: i64,
        end: i64,
    },
    /// Add a new shift.
    Add {
        day: i64,
        start: i64,
        end: i64,
        skill: &'static str,
        employee: Option<FactId>,
    },
    /// Remove a shift.
    Remove { shift: FactId },
    /// Replace an employee's skills.
    Reskill {
        employee: FactId,
        skills: Vec<&'static str>,
    },
}

/// Deterministic generator of schedules and moves.
pub struct ScheduleGenerator {
    rng: ChaCha8Rng,
}

impl ScheduleGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// A schedule with random skills, shift times and assignments. About
    /// one shift in five is left unassigned.
    pub fn schedule(&mut self, employees: usize, shifts: usize) -> Schedule {
        self.schedule_for(scheduling::descriptor(), employees, shifts)
    }

    /// Like [`schedule`](Self::schedule), over an existing descriptor.
    pub fn schedule_for(
        &mut self,
        descriptor: Arc<SolutionDescriptor>,
        employees: usize,
        shifts: usize,
    ) -> Schedule {
        let mut schedule = Schedule::with_descriptor(descriptor);
        for i in 0..employees {
            let skills = self.skills();
            schedule.add_employee(&format!("Employee {}", i), &skills);
        }
        for _ in 0..shifts {
            let (day, start, end) = self.window();
            let skill = self.skill();
            let employee = self.employee(&schedule);
            schedule.add_shift(day, start, end, skill, employee);
        }
        schedule
    }

    /// A random move against the shifts in `live`.
    pub fn next_move(&mut self, schedule: &Schedule, live: &[FactId]) -> ShiftMove {
        if live.is_empty() {
            return self.add(schedule);
        }
        let shift = live[self.rng.random_range(0..live.len())];
        match self.rng.random_range(0..11) {
            0..=5 => ShiftMove::Assign {
                shift,
                employee: self
                    .employee(schedule)
                    .map_or(Value::None, Value::Fact),
            },
            6 | 7 => {
                let (day, start, end) = self.window();
                ShiftMove::Reschedule {
                    shift,
                    day,
                    start,
                    end,
                }
            }
            8 => self.add(schedule),
            9 => ShiftMove::Remove { shift },
            _ => match self.employee(schedule) {
                Some(employee) => ShiftMove::Reskill {
                    employee,
                    skills: self.skills(),
                },
                None => ShiftMove::Remove { shift },
            },
        }
    }

    fn add(&mut self, schedule: &Schedule) -> ShiftMove {
        let (day, start, end) = self.window();
        ShiftMove::Add {
            day,
            start,
            end,
            skill: self.skill(),
            employee: self.employee(schedule),
        }
    }

    fn window(&mut self) -> (i64, i64, i64) {
        let day = self.rng.random_range(0..DAYS);
        let start = day * MINUTES_PER_DAY + self.rng.random_range(0..16) * 60;
        let end = start + self.rng.random_range(4..=10) * 60;
        (day, start, end)
    }

    fn skills(&mut self) -> Vec<&'static str> {
        SKILLS
            .iter()
            .copied()
            .filter(|_| self.rng.random_bool(0.5))
            .collect()
    }

    fn skill(&mut self) -> &'static str {
        SKILLS[self.rng.random_range(0..SKILLS.len())]
    }

    fn employee(&mut self, schedule: &Schedule) -> Option<FactId> {
        if schedule.employees.is_empty() || self.rng.random_bool(0.2) {
            return None;
        }
        Some(schedule.employees[self.rng.random_range(0..schedule.employees.len())])
    }
}

/// Field writes a move performs on an existing fact, as `(field, value)`.
pub fn field_writes(shift_move: &ShiftMove) -> Vec<(usize, Value)> {
    match shift_move {
        ShiftMove::Assign { employee, .. } => vec![(scheduling::ASSIGNEE, employee.clone())],
        ShiftMove::Reschedule {
            day, start, end, ..
        } => vec![
            (scheduling::DAY, Value::Int(*day)),
            (scheduling::START, Value::Int(*start)),
            (scheduling::END, Value::Int(*end)),
        ],
        ShiftMove::Reskill { skills, .. } => vec![(
            scheduling::SKILLS,
            Value::list(skills.iter().map(|s| Value::str(s))),
        )],
        ShiftMove::Add { .. } | ShiftMove::Remove { .. } => Vec::new(),
    }
}
