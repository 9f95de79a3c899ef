//! Project domain model populated by the SP reader.
//!
//! Entities live in index-addressed arenas owned by [`ProjectFile`] and refer
//! to each other through the [`CalendarId`], [`ResourceId`] and [`TaskId`]
//! handles. The model only grows: the reader adds calendars, resources, tasks,
//! relations and assignments and never removes them.

mod calendar;

pub use calendar::{Calendar, CalendarException, Day, TimeRange};

use chrono::NaiveDateTime;
use std::fmt;
use uuid::Uuid;

/// Handle to a calendar in a [`ProjectFile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CalendarId(usize);

/// Handle to a resource in a [`ProjectFile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(usize);

/// Handle to a task in a [`ProjectFile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(usize);

impl TaskId {
    /// Position of the task in creation order
    pub fn index(self) -> usize {
        self.0
    }
}

/// A duration measured in hours
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Duration {
    hours: f64,
}

impl Duration {
    /// Zero-length duration
    pub const ZERO: Duration = Duration { hours: 0.0 };

    /// Creates a duration from a number of hours
    pub fn from_hours(hours: f64) -> Self {
        Self { hours }
    }

    /// Length in hours
    pub fn hours(&self) -> f64 {
        self.hours
    }

    /// The same length with the sign flipped
    pub fn negated(self) -> Self {
        Self { hours: -self.hours }
    }

    /// Returns true if the duration is exactly zero
    pub fn is_zero(&self) -> bool {
        self.hours == 0.0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h", self.hours)
    }
}

/// Scheduling constraint applied to a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    /// As soon as possible
    AsSoonAsPossible,
    /// As late as possible
    AsLateAsPossible,
    /// Must start on the constraint date
    MustStartOn,
    /// Must finish on the constraint date
    MustFinishOn,
    /// Start no earlier than the constraint date
    StartNoEarlierThan,
    /// Start no later than the constraint date
    StartNoLaterThan,
    /// Finish no earlier than the constraint date
    FinishNoEarlierThan,
    /// Finish no later than the constraint date
    FinishNoLaterThan,
}

/// Kind of dependency between two tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationType {
    /// Finish to start
    FinishStart,
    /// Start to finish
    StartFinish,
    /// Start to start
    StartStart,
    /// Finish to finish
    FinishFinish,
}

impl RelationType {
    /// Short code (FS, SF, SS, FF)
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::FinishStart => "FS",
            RelationType::StartFinish => "SF",
            RelationType::StartStart => "SS",
            RelationType::FinishFinish => "FF",
        }
    }
}

/// File-level properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectProperties {
    /// Application that produced the file
    pub file_application: Option<String>,
    /// File type
    pub file_type: Option<String>,
    /// Calendar used by tasks without their own calendar
    pub default_calendar: Option<CalendarId>,
}

/// A person, piece of equipment or material
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resource {
    /// Resource name
    pub name: Option<String>,
    /// Identifier from the source file
    pub guid: Option<Uuid>,
    /// Email address
    pub email_address: Option<String>,
    /// Hyperlink
    pub hyperlink: Option<String>,
    /// Free-text notes
    pub notes: Option<String>,
    /// Description text
    pub description: Option<String>,
    /// Supply reference text
    pub supply_reference: Option<String>,
    /// Whether the resource is active
    pub active: bool,
    /// Enclosing resource in the source hierarchy
    pub parent: Option<ResourceId>,
}

/// A unit of work in the task hierarchy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Task {
    /// Task name
    pub name: Option<String>,
    /// Identifier from the source file
    pub guid: Option<Uuid>,
    /// User-visible task code
    pub code: Option<String>,
    /// Planned duration
    pub duration: Option<Duration>,
    /// Remaining duration
    pub remaining_duration: Option<Duration>,
    /// Hyperlink
    pub hyperlink: Option<String>,
    /// Percent complete (0..=100)
    pub percent_complete: Option<f64>,
    /// Free-text notes
    pub notes: Option<String>,
    /// Whether the task is a milestone
    pub milestone: bool,
    /// Calendar overriding the project default
    pub calendar: Option<CalendarId>,
    /// Scheduled start
    pub start: Option<NaiveDateTime>,
    /// Scheduled finish
    pub finish: Option<NaiveDateTime>,
    /// Actual start
    pub actual_start: Option<NaiveDateTime>,
    /// Actual finish
    pub actual_finish: Option<NaiveDateTime>,
    /// Constraint type
    pub constraint_type: Option<ConstraintType>,
    /// Constraint date
    pub constraint_date: Option<NaiveDateTime>,
    /// Parent task; `None` for top-level tasks
    pub parent: Option<TaskId>,
    /// Child tasks in source order
    pub children: Vec<TaskId>,
}

impl Task {
    /// Returns true if the task has child tasks
    pub fn is_summary(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Dependency of `task` on `predecessor`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Relation {
    /// The dependent task
    pub task: TaskId,
    /// The task it depends on
    pub predecessor: TaskId,
    /// Dependency type
    pub relation_type: RelationType,
    /// Signed lag
    pub lag: Duration,
}

/// Assignment of a resource to a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceAssignment {
    /// The task
    pub task: TaskId,
    /// The assigned resource
    pub resource: ResourceId,
}

/// Project aggregate: calendars, resources, tasks and the links between them
#[derive(Debug, Clone, Default)]
pub struct ProjectFile {
    properties: ProjectProperties,
    calendars: Vec<Calendar>,
    resources: Vec<Resource>,
    tasks: Vec<Task>,
    root_tasks: Vec<TaskId>,
    relations: Vec<Relation>,
    assignments: Vec<ResourceAssignment>,
}

impl ProjectFile {
    /// Creates an empty project
    pub fn new() -> Self {
        Self::default()
    }

    /// File-level properties
    pub fn properties(&self) -> &ProjectProperties {
        &self.properties
    }

    /// Mutable file-level properties
    pub fn properties_mut(&mut self) -> &mut ProjectProperties {
        &mut self.properties
    }

    /// Adds a calendar and returns its handle
    pub fn add_calendar(&mut self, calendar: Calendar) -> CalendarId {
        self.calendars.push(calendar);
        CalendarId(self.calendars.len() - 1)
    }

    /// Looks up a calendar
    pub fn calendar(&self, id: CalendarId) -> &Calendar {
        &self.calendars[id.0]
    }

    /// All calendars in creation order
    pub fn calendars(&self) -> &[Calendar] {
        &self.calendars
    }

    /// The default calendar, if one is set
    pub fn default_calendar(&self) -> Option<&Calendar> {
        self.properties.default_calendar.map(|id| self.calendar(id))
    }

    /// Adds a resource and returns its handle
    pub fn add_resource(&mut self, resource: Resource) -> ResourceId {
        self.resources.push(resource);
        ResourceId(self.resources.len() - 1)
    }

    /// Looks up a resource
    pub fn resource(&self, id: ResourceId) -> &Resource {
        &self.resources[id.0]
    }

    /// All resources in creation order
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Adds a task under `parent` (or at the top level) and returns its handle
    pub fn add_task(&mut self, parent: Option<TaskId>, mut task: Task) -> TaskId {
        let id = TaskId(self.tasks.len());
        task.parent = parent;
        self.tasks.push(task);
        match parent {
            Some(parent) => self.tasks[parent.0].children.push(id),
            None => self.root_tasks.push(id),
        }
        id
    }

    /// Looks up a task
    pub fn task(&self, id: TaskId) -> &Task {
        &self.tasks[id.0]
    }

    /// Mutable task lookup
    pub fn task_mut(&mut self, id: TaskId) -> &mut Task {
        &mut self.tasks[id.0]
    }

    /// All tasks in creation order (parents before their children)
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Top-level tasks in source order
    pub fn root_tasks(&self) -> &[TaskId] {
        &self.root_tasks
    }

    /// Calendar governing a task: its own, else the project default
    pub fn effective_calendar(&self, id: TaskId) -> Option<&Calendar> {
        self.task(id)
            .calendar
            .or(self.properties.default_calendar)
            .map(|calendar| self.calendar(calendar))
    }

    /// Records a dependency
    pub fn add_relation(&mut self, relation: Relation) {
        self.relations.push(relation);
    }

    /// All dependencies
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Dependencies of one task on its predecessors
    pub fn predecessors(&self, id: TaskId) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(move |r| r.task == id)
    }

    /// Records a resource assignment
    pub fn add_assignment(&mut self, assignment: ResourceAssignment) {
        self.assignments.push(assignment);
    }

    /// All resource assignments
    pub fn assignments(&self) -> &[ResourceAssignment] {
        &self.assignments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_hierarchy() {
        let mut project = ProjectFile::new();
        let parent = project.add_task(None, Task::default());
        let child = project.add_task(Some(parent), Task::default());

        assert_eq!(project.root_tasks(), &[parent]);
        assert_eq!(project.task(parent).children, vec![child]);
        assert_eq!(project.task(child).parent, Some(parent));
        assert!(project.task(parent).is_summary());
        assert!(!project.task(child).is_summary());
    }

    #[test]
    fn test_effective_calendar() {
        let mut project = ProjectFile::new();
        let mut standard = Calendar::new();
        standard.name = Some("Standard".to_string());
        let mut night = Calendar::new();
        night.name = Some("Night".to_string());
        let standard = project.add_calendar(standard);
        let night = project.add_calendar(night);
        project.properties_mut().default_calendar = Some(standard);

        let plain = project.add_task(None, Task::default());
        let own = project.add_task(
            None,
            Task {
                calendar: Some(night),
                ..Task::default()
            },
        );

        let name = |id| project.effective_calendar(id).and_then(|c| c.name.as_deref());
        assert_eq!(name(plain), Some("Standard"));
        assert_eq!(name(own), Some("Night"));
    }

    #[test]
    fn test_duration_negated() {
        let lag = Duration::from_hours(8.0).negated();
        assert_eq!(lag.hours(), -8.0);
        assert!(Duration::ZERO.is_zero());
        assert_eq!(lag.to_string(), "-8h");
    }
}
