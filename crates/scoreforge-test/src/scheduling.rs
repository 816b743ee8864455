//! Employee scheduling fixtures.
//!
//! Shifts are assigned to employees through the `employee` planning
//! variable. Times are minutes from the start of the schedule.
//!
//! # Example
//!
//! ```
//! use scoreforge_test::scheduling::{self, Schedule};
//!
//! let mut schedule = Schedule::new();
//! let ann = schedule.add_employee("Ann", &["nurse"]);
//! schedule.add_shift(0, 0, 480, "nurse", Some(ann));
//! schedule.add_shift(0, 240, 720, "doctor", Some(ann));
//!
//! assert_eq!(scheduling::missing_skill_count(&schedule.solution), 1);
//! assert_eq!(scheduling::overlap_minutes(&schedule.solution), 240);
//! ```

use std::sync::Arc;

use scoreforge_core::{
    Fact, FactClassDescriptor, FactId, FieldDescriptor, FieldType, SolutionDescriptor, Value,
    WorkingSolution,
};

pub const EMPLOYEE: usize = 0;
pub const SHIFT: usize = 1;

// Employee fields.
pub const NAME: usize = 0;
pub const SKILLS: usize = 1;

// Shift fields.
pub const ASSIGNEE: usize = 0;
pub const DAY: usize = 1;
pub const START: usize = 2;
pub const END: usize = 3;
pub const REQUIRED_SKILL: usize = 4;

/// Descriptor of the scheduling domain.
pub fn descriptor() -> Arc<SolutionDescriptor> {
    let mut descriptor = SolutionDescriptor::new("EmployeeSchedule");
    let classes = [
        FactClassDescriptor::new("Employee")
            .with_field(FieldDescriptor::new("name", FieldType::Str))
            .with_field(FieldDescriptor::new("skills", FieldType::List)),
        FactClassDescriptor::new("Shift")
            .with_field(FieldDescriptor::planning_variable("employee", FieldType::Fact))
            .with_field(FieldDescriptor::new("day", FieldType::Int))
            .with_field(FieldDescriptor::new("start", FieldType::Int))
            .with_field(FieldDescriptor::new("end", FieldType::Int))
            .with_field(FieldDescriptor::new("required_skill", FieldType::Str)),
    ];
    for class in classes {
        descriptor
            .add_class(class)
            .expect("scheduling classes are distinct");
    }
    Arc::new(descriptor)
}

/// A working solution plus the ids of what was put in it.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub solution: WorkingSolution,
    pub employees: Vec<FactId>,
    pub shifts: Vec<FactId>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::with_descriptor(descriptor())
    }

    /// An empty schedule over a shared descriptor, so several schedules can
    /// be scored by one network. `descriptor` must come from [`descriptor`].
    pub fn with_descriptor(descriptor: Arc<SolutionDescriptor>) -> Self {
        Self {
            solution: WorkingSolution::new(descriptor),
            employees: Vec::new(),
            shifts: Vec::new(),
        }
    }

    pub fn descriptor(&self) -> &Arc<SolutionDescriptor> {
        self.solution.descriptor()
    }

    pub fn add_employee(&mut self, name: &str, skills: &[&str]) -> FactId {
        let skills = Value::list(skills.iter().map(|s| Value::str(s)));
        let id = self
            .solution
            .insert(Fact::new(EMPLOYEE, vec![Value::str(name), skills]))
            .expect("employee fields match the descriptor");
        self.employees.push(id);
        id
    }

    pub fn add_shift(
        &mut self,
        day: i64,
        start: i64,
        end: i64,
        skill: &str,
        employee: Option<FactId>,
    ) -> FactId {
        let id = self
            .solution
            .insert(shift(day, start, end, skill, employee))
            .expect("shift fields match the descriptor");
        self.shifts.push(id);
        id
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

/// A shift fact, for inserting through a session.
pub fn shift(day: i64, start: i64, end: i64, skill: &str, employee: Option<FactId>) -> Fact {
    Fact::new(
        SHIFT,
        vec![
            employee.map_or(Value::None, Value::Fact),
            Value::Int(day),
            Value::Int(start),
            Value::Int(end),
            Value::str(skill),
        ],
    )
}

fn int(fact: &Fact, field: usize) -> i64 {
    fact.fields[field].as_int().unwrap_or(0)
}

fn assigned_shifts(solution: &WorkingSolution) -> Vec<(FactId, &Fact)> {
    solution
        .facts_of(SHIFT)
        .filter_map(|(_, shift)| shift.fields[ASSIGNEE].as_fact().map(|e| (e, shift)))
        .collect()
}

/// Assigned shifts whose employee lacks the required skill.
pub fn missing_skill_count(solution: &WorkingSolution) -> i64 {
    assigned_shifts(solution)
        .into_iter()
        .filter(|(employee, shift)| {
            let skills = solution
                .get(*employee)
                .and_then(|e| e.fields[SKILLS].as_list())
                .unwrap_or(&[]);
            !skills.contains(&shift.fields[REQUIRED_SKILL])
        })
        .count() as i64
}

/// Total minutes of overlap between pairs of shifts of the same employee.
pub fn overlap_minutes(solution: &WorkingSolution) -> i64 {
    let shifts = assigned_shifts(solution);
    let mut total = 0;
    for (i, (employee, a)) in shifts.iter().enumerate() {
        for (other, b) in &shifts[i + 1..] {
            if employee != other {
                continue;
            }
            let overlap = int(a, END).min(int(b, END)) - int(a, START).max(int(b, START));
            total += overlap.max(0);
        }
    }
    total
}

/// Shifts per employee, for every employee with at least one shift.
pub fn shift_counts(solution: &WorkingSolution) -> Vec<(FactId, i64)> {
    let mut counts: Vec<(FactId, i64)> = Vec::new();
    for (employee, _) in assigned_shifts(solution) {
        match counts.iter_mut().find(|(e, _)| *e == employee) {
            Some((_, n)) => *n += 1,
            None => counts.push((employee, 1)),
        }
    }
    counts.sort();
    counts
}
