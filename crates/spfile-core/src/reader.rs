//! Maps decoded SP tables onto the project model.
//!
//! Decoding runs in two passes. The first builds calendars, resources and the
//! task tree, registering each entity by UUID and setting aside every task's
//! predecessor and assignment rows. The second resolves those deferred rows
//! against the registries; references that cannot be resolved are dropped.

use crate::container::{Container, RequiredTable};
use crate::diagnostics::{DiagnosticSink, NullSink};
use crate::error::{Error, Result};
use crate::model::{
    Calendar, CalendarId, ConstraintType, Day, Duration, ProjectFile, Relation, RelationType,
    Resource, ResourceAssignment, ResourceId, Task, TaskId, TimeRange,
};
use crate::stream::DEFAULT_MAX_NESTING_DEPTH;
use crate::table::{CalendarReader, CompanyReader, MapRow, TaskReader};
use chrono::{Duration as ChronoDuration, NaiveDateTime};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, trace};
use uuid::Uuid;

/// Default cap on the inflated size of a single table
pub const DEFAULT_MAX_TABLE_SIZE: usize = 256 * 1024 * 1024;

/// Default number of days scanned when projecting a planned finish
pub const DEFAULT_PROJECTION_HORIZON_DAYS: u32 = 3660;

/// Task status codes
const STATUS_PLANNED: i32 = 1;
const STATUS_STARTED: i32 = 2;
const STATUS_FINISHED: i32 = 3;

/// `LAG_SIGN` value marking a negative lag
const NEGATIVE_LAG: i32 = 2;

/// Weekday day-type columns, Sunday first
const DAY_TYPE_COLUMNS: [(Day, &str); 7] = [
    (Day::Sunday, "SUNDAY_DAY_TYPE"),
    (Day::Monday, "MONDAY_DAY_TYPE"),
    (Day::Tuesday, "TUESDAY_DAY_TYPE"),
    (Day::Wednesday, "WEDNESDAY_DAY_TYPE"),
    (Day::Thursday, "THURSDAY_DAY_TYPE"),
    (Day::Friday, "FRIDAY_DAY_TYPE"),
    (Day::Saturday, "SATURDAY_DAY_TYPE"),
];

/// Configuration for [`SpReader`]
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Largest accepted inflated table, in bytes
    pub max_table_size: usize,
    /// Calendar days scanned when projecting a planned task's finish
    pub projection_horizon_days: u32,
    /// Deepest accepted nesting of tables, counting the top-level table
    pub max_nesting_depth: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_table_size: DEFAULT_MAX_TABLE_SIZE,
            projection_horizon_days: DEFAULT_PROJECTION_HORIZON_DAYS,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl ReaderConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inflated table size limit
    pub fn max_table_size(mut self, bytes: usize) -> Self {
        self.max_table_size = bytes;
        self
    }

    /// Set the finish projection horizon
    pub fn projection_horizon_days(mut self, days: u32) -> Self {
        self.projection_horizon_days = days;
        self
    }

    /// Set the table nesting limit
    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }
}

/// Reader for SP project files.
///
/// Every decoding failure is reported as [`Error::InvalidFile`] wrapping the
/// cause, so a caller trying several formats can move on to the next one.
#[derive(Debug, Clone, Default)]
pub struct SpReader {
    config: ReaderConfig,
}

impl SpReader {
    /// Create a reader with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reader with custom configuration
    pub fn with_config(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// Current configuration
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Decode a project from a byte stream
    pub fn read<R: Read>(&self, input: R) -> Result<ProjectFile> {
        self.read_with_sink(input, &mut NullSink)
    }

    /// Decode a project, reporting raw structure to `sink`
    pub fn read_with_sink<R: Read>(
        &self,
        input: R,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<ProjectFile> {
        self.decode(input, sink).map_err(Error::invalid_file)
    }

    /// Decode a project from a file on disk
    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<ProjectFile> {
        self.read_file_with_sink(path, &mut NullSink)
    }

    /// Decode a project from a file on disk, reporting raw structure to `sink`
    pub fn read_file_with_sink(
        &self,
        path: impl AsRef<Path>,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<ProjectFile> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::file_read(path, e))?;
        self.read_with_sink(BufReader::new(file), sink)
    }

    fn decode<R: Read>(&self, input: R, sink: &mut dyn DiagnosticSink) -> Result<ProjectFile> {
        let container = Container::read(input, self.config.max_table_size, sink)?;
        let mut decoder = Decoder::new(&self.config);
        decoder.process_calendars(&container, sink)?;
        decoder.process_resources(&container, sink)?;
        decoder.process_tasks(&container, sink)?;
        decoder.process_predecessors();
        decoder.process_assignments();

        let project = decoder.project;
        debug!(
            calendars = project.calendars().len(),
            resources = project.resources().len(),
            tasks = project.tasks().len(),
            relations = project.relations().len(),
            assignments = project.assignments().len(),
            "decoded SP project"
        );
        Ok(project)
    }
}

/// State of one decode: the project under construction, the UUID registries
/// and the rows deferred to the second pass
struct Decoder<'c> {
    config: &'c ReaderConfig,
    project: ProjectFile,
    calendars: HashMap<Uuid, CalendarId>,
    resources: HashMap<Uuid, ResourceId>,
    tasks: HashMap<Uuid, TaskId>,
    predecessors: Vec<(TaskId, Vec<MapRow>)>,
    assignments: Vec<(TaskId, Vec<MapRow>)>,
}

impl<'c> Decoder<'c> {
    fn new(config: &'c ReaderConfig) -> Self {
        let mut project = ProjectFile::new();
        let properties = project.properties_mut();
        properties.file_application = Some("Synchro".to_string());
        properties.file_type = Some("SP".to_string());

        Self {
            config,
            project,
            calendars: HashMap::new(),
            resources: HashMap::new(),
            tasks: HashMap::new(),
            predecessors: Vec::new(),
            assignments: Vec::new(),
        }
    }

    fn process_calendars(
        &mut self,
        container: &Container,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<()> {
        let mut reader = CalendarReader::default();
        let rows = container
            .table_data(RequiredTable::Calendars, sink)?
            .with_max_depth(self.config.max_nesting_depth)
            .read_table_with(&mut reader)?;

        for row in &rows {
            self.process_calendar(row);
        }

        let default = reader
            .default_calendar()
            .and_then(|uuid| self.calendars.get(&uuid).copied());
        if default.is_none() {
            trace!(uuid = ?reader.default_calendar(), "default calendar not found");
        }
        self.project.properties_mut().default_calendar = default;
        Ok(())
    }

    fn process_calendar(&mut self, row: &MapRow) {
        let day_types: HashMap<Uuid, Vec<TimeRange>> = row
            .get_rows("DAY_TYPES")
            .iter()
            .filter_map(|day_type| Some((day_type.get_uuid("UUID")?, time_ranges(day_type))))
            .collect();
        let ranges_for = |uuid: Option<Uuid>| {
            uuid.and_then(|uuid| day_types.get(&uuid))
                .cloned()
                .unwrap_or_default()
        };

        let mut calendar = Calendar::new();
        calendar.name = row.get_string("NAME").map(str::to_string);
        for (day, column) in DAY_TYPE_COLUMNS {
            calendar.set_hours(day, ranges_for(row.get_uuid(column)));
        }

        for assignment in row.get_rows("DAY_TYPE_ASSIGNMENTS") {
            let Some(date) = assignment.get_date("DATE") else {
                trace!("skipping calendar exception without a date");
                continue;
            };
            let date = date.date();
            calendar.add_exception(date, date, ranges_for(assignment.get_uuid("DAY_TYPE_UUID")));
        }

        let id = self.project.add_calendar(calendar);
        if let Some(uuid) = row.get_uuid("UUID") {
            self.calendars.insert(uuid, id);
        }
    }

    fn process_resources(
        &mut self,
        container: &Container,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<()> {
        let companies = container
            .table_data(RequiredTable::Companies, sink)?
            .with_max_depth(self.config.max_nesting_depth)
            .read_table::<CompanyReader>()?;

        for mut company in companies {
            // siblings are ordered by name only; resource type is not considered
            for row in sorted_by_name(company.take_rows("RESOURCES")) {
                self.process_resource(None, row);
            }
        }
        Ok(())
    }

    fn process_resource(&mut self, parent: Option<ResourceId>, mut row: MapRow) {
        let resource = Resource {
            name: row.get_string("NAME").map(str::to_string),
            guid: row.get_uuid("UUID"),
            email_address: row.get_string("EMAIL").map(str::to_string),
            hyperlink: row.get_string("URL").map(str::to_string),
            notes: notes(row.get_rows("COMMENTARY")),
            description: row.get_string("DESCRIPTION").map(str::to_string),
            supply_reference: row.get_string("SUPPLY_REFERENCE").map(str::to_string),
            active: true,
            parent,
        };
        let guid = resource.guid;
        let id = self.project.add_resource(resource);

        for child in sorted_by_name(row.take_rows("RESOURCES")) {
            self.process_resource(Some(id), child);
        }

        if let Some(uuid) = guid {
            self.resources.insert(uuid, id);
        }
    }

    fn process_tasks(
        &mut self,
        container: &Container,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<()> {
        let rows = container
            .table_data(RequiredTable::Tasks, sink)?
            .with_max_depth(self.config.max_nesting_depth)
            .read_table::<TaskReader>()?;

        for row in rows {
            self.process_task(None, row);
        }

        let roots = self.project.root_tasks().to_vec();
        for root in roots {
            update_dates(&mut self.project, root);
        }
        Ok(())
    }

    fn process_task(&mut self, parent: Option<TaskId>, mut row: MapRow) {
        let duration = row.get_duration("PLANNED_DURATION");
        let mut task = Task {
            name: row.get_string("NAME").map(str::to_string),
            guid: row.get_uuid("UUID"),
            code: row.get_string("ID").map(str::to_string),
            duration,
            remaining_duration: row.get_duration("REMAINING_DURATION"),
            hyperlink: row.get_string("URL").map(str::to_string),
            percent_complete: row.get_double("PERCENT_COMPLETE"),
            notes: notes(row.get_rows("COMMENTARY")),
            milestone: duration.is_some_and(|d| d.is_zero()),
            ..Task::default()
        };

        let default_calendar = self.project.properties().default_calendar;
        let calendar = row
            .get_uuid("CALENDAR_UUID")
            .and_then(|uuid| self.calendars.get(&uuid).copied());
        if calendar.is_some() && calendar != default_calendar {
            task.calendar = calendar;
        }

        match row.get_integer("STATUS") {
            Some(STATUS_PLANNED) => {
                task.start = row.get_date("PLANNED_START");
                let calendar = task
                    .calendar
                    .or(default_calendar)
                    .map(|id| self.project.calendar(id));
                task.finish = task.start.and_then(|start| {
                    project_finish(
                        calendar,
                        start,
                        duration.unwrap_or(Duration::ZERO),
                        self.config.projection_horizon_days,
                    )
                });
            }
            Some(STATUS_STARTED) => {
                task.actual_start = row.get_date("ACTUAL_START");
                task.start = task.actual_start;
                task.finish = row
                    .get_date("ESTIMATED_FINISH")
                    .or_else(|| row.get_date("PLANNED_FINISH"));
            }
            Some(STATUS_FINISHED) => {
                task.actual_start = row.get_date("ACTUAL_START");
                task.actual_finish = row.get_date("ACTUAL_FINISH");
                task.percent_complete = Some(100.0);
                task.start = task.actual_start;
                task.finish = task.actual_finish;
            }
            status => trace!(?status, "task status not recognised"),
        }

        if let Some((constraint_type, constraint_date)) = constraint(
            row.get_integer("CONSTRAINT_TYPE").unwrap_or(0),
            task.start,
            row.get_date("CONSTRAINT_EARLY_DATE"),
            row.get_date("CONSTRAINT_LATE_DATE"),
        ) {
            task.constraint_type = Some(constraint_type);
            task.constraint_date = constraint_date;
        }

        let guid = task.guid;
        let id = self.project.add_task(parent, task);

        for child in row.take_rows("TASKS") {
            self.process_task(Some(id), child);
        }

        if let Some(uuid) = guid {
            self.tasks.insert(uuid, id);
        }

        let predecessors = row.take_rows("PREDECESSORS");
        if !predecessors.is_empty() {
            self.predecessors.push((id, predecessors));
        }
        let assignments = row.take_rows("RESOURCE_ASSIGNMENTS");
        if !assignments.is_empty() {
            self.assignments.push((id, assignments));
        }
    }

    fn process_predecessors(&mut self) {
        for (task, rows) in std::mem::take(&mut self.predecessors) {
            for row in rows {
                let Some(predecessor) = row
                    .get_uuid("PREDECESSOR_UUID")
                    .and_then(|uuid| self.tasks.get(&uuid).copied())
                else {
                    trace!(task = task.index(), "dropping unresolved predecessor");
                    continue;
                };

                let mut lag = row.get_duration("LAG").unwrap_or(Duration::ZERO);
                if row.get_integer("LAG_SIGN") == Some(NEGATIVE_LAG) {
                    lag = lag.negated();
                }

                self.project.add_relation(Relation {
                    task,
                    predecessor,
                    relation_type: relation_type(row.get_integer("RELATION_TYPE").unwrap_or(0)),
                    lag,
                });
            }
        }
    }

    fn process_assignments(&mut self) {
        for (task, rows) in std::mem::take(&mut self.assignments) {
            for row in rows {
                let Some(resource) = row
                    .get_uuid("RESOURCE_UUID")
                    .and_then(|uuid| self.resources.get(&uuid).copied())
                else {
                    trace!(task = task.index(), "dropping unresolved resource assignment");
                    continue;
                };
                self.project
                    .add_assignment(ResourceAssignment { task, resource });
            }
        }
    }
}

/// Working time ranges of a day type row
fn time_ranges(day_type: &MapRow) -> Vec<TimeRange> {
    day_type
        .get_rows("TIME_RANGES")
        .iter()
        .filter_map(|range| Some(TimeRange::new(range.get_time("START")?, range.get_time("END")?)))
        .collect()
}

/// Stable sort by the `NAME` column; rows without a name come first
fn sorted_by_name(mut rows: Vec<MapRow>) -> Vec<MapRow> {
    rows.sort_by(|a, b| a.get_string("NAME").cmp(&b.get_string("NAME")));
    rows
}

/// Concatenated commentary rows, `None` if there are none
fn notes(rows: &[MapRow]) -> Option<String> {
    if rows.is_empty() {
        return None;
    }
    let mut text = String::new();
    for row in rows {
        text.push_str(row.get_string("TITLE").unwrap_or_default());
        text.push('\n');
        text.push_str(row.get_string("TEXT").unwrap_or_default());
        text.push_str("\n\n");
    }
    Some(text)
}

/// Finish of `duration` worth of work from `start`, in working time when a
/// calendar is available and elapsed time otherwise
fn project_finish(
    calendar: Option<&Calendar>,
    start: NaiveDateTime,
    duration: Duration,
    horizon_days: u32,
) -> Option<NaiveDateTime> {
    match calendar {
        Some(calendar) => calendar.finish_date(start, duration.hours(), horizon_days),
        None => {
            let minutes = (duration.hours() * 60.0).round() as i64;
            start.checked_add_signed(ChronoDuration::minutes(minutes))
        }
    }
}

/// Translate a constraint code into a constraint type and date.
///
/// `start` is the task's derived start; `early` and `late` are the row's
/// constraint dates. Unknown codes yield no constraint.
pub fn constraint(
    code: i32,
    start: Option<NaiveDateTime>,
    early: Option<NaiveDateTime>,
    late: Option<NaiveDateTime>,
) -> Option<(ConstraintType, Option<NaiveDateTime>)> {
    let mapped = match code {
        // cannot reschedule
        2 => (ConstraintType::MustStartOn, start),
        3 => (ConstraintType::AsSoonAsPossible, None),
        4 => (ConstraintType::AsLateAsPossible, None),
        // start on, finish on, mandatory start
        5 | 9 | 13 => (ConstraintType::MustStartOn, early),
        6 => (ConstraintType::StartNoLaterThan, early),
        // start between: the early date is carried but the type ignores it
        8 => (ConstraintType::AsSoonAsPossible, early),
        10 => (ConstraintType::FinishNoEarlierThan, early),
        11 => (ConstraintType::FinishNoLaterThan, late),
        // finish between
        12 => (ConstraintType::MustFinishOn, late),
        // mandatory finish
        14 => (ConstraintType::MustFinishOn, early),
        // work between
        15 => (ConstraintType::StartNoEarlierThan, early),
        _ => return None,
    };
    Some(mapped)
}

/// Translate a relation type code; unknown codes read as finish-start
pub fn relation_type(code: i32) -> RelationType {
    match code {
        2 => RelationType::StartFinish,
        3 => RelationType::StartStart,
        4 => RelationType::FinishFinish,
        _ => RelationType::FinishStart,
    }
}

/// Roll child dates up into summary tasks, bottom-up
fn update_dates(project: &mut ProjectFile, id: TaskId) {
    let children = project.task(id).children.clone();
    if children.is_empty() {
        return;
    }

    let mut start = None;
    let mut finish = None;
    for child in children {
        update_dates(project, child);
        let child = project.task(child);
        start = earliest(start, child.start);
        finish = latest(finish, child.finish);
    }

    let task = project.task_mut(id);
    task.start = start;
    task.finish = finish;
}

fn earliest(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn latest(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use chrono::{NaiveDate, NaiveTime};
    use pretty_assertions::assert_eq;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn weekday_calendar() -> Calendar {
        let working = vec![
            TimeRange::new(hm(8, 0), hm(12, 0)),
            TimeRange::new(hm(13, 0), hm(17, 0)),
        ];
        let mut calendar = Calendar::new();
        for day in Day::ALL {
            let ranges = match day {
                Day::Saturday | Day::Sunday => Vec::new(),
                _ => working.clone(),
            };
            calendar.set_hours(day, ranges);
        }
        calendar
    }

    fn task_row(status: i32, fields: Vec<(&'static str, Value)>) -> MapRow {
        let mut row: MapRow = fields.into_iter().collect();
        row.put("STATUS", Value::Integer(status));
        row
    }

    #[test]
    fn test_constraint_codes() {
        let start = Some(at(2020, 1, 1, 8));
        let early = Some(at(2020, 2, 1, 8));
        let late = Some(at(2020, 3, 1, 0));

        assert_eq!(
            constraint(11, start, early, late),
            Some((ConstraintType::FinishNoLaterThan, late))
        );
        assert_eq!(
            constraint(3, start, early, late),
            Some((ConstraintType::AsSoonAsPossible, None))
        );
        assert_eq!(
            constraint(2, start, early, late),
            Some((ConstraintType::MustStartOn, start))
        );
        assert_eq!(
            constraint(8, start, early, late),
            Some((ConstraintType::AsSoonAsPossible, early))
        );
        assert_eq!(
            constraint(12, start, early, late),
            Some((ConstraintType::MustFinishOn, late))
        );
        assert_eq!(
            constraint(14, start, early, late),
            Some((ConstraintType::MustFinishOn, early))
        );
        for code in [5, 9, 13] {
            assert_eq!(
                constraint(code, start, early, late),
                Some((ConstraintType::MustStartOn, early))
            );
        }
        for code in [0, 1, 7, 16, -1] {
            assert_eq!(constraint(code, start, early, late), None);
        }
    }

    #[test]
    fn test_relation_types() {
        assert_eq!(relation_type(1), RelationType::FinishStart);
        assert_eq!(relation_type(2), RelationType::StartFinish);
        assert_eq!(relation_type(3), RelationType::StartStart);
        assert_eq!(relation_type(4), RelationType::FinishFinish);
        assert_eq!(relation_type(0), RelationType::FinishStart);
        assert_eq!(relation_type(9), RelationType::FinishStart);
    }

    #[test]
    fn test_notes() {
        let rows: Vec<MapRow> = vec![
            [
                ("TITLE", Value::String(Some("Access".to_string()))),
                ("TEXT", Value::String(Some("Gate 3 only".to_string()))),
            ]
            .into_iter()
            .collect(),
            [("TITLE", Value::String(None))].into_iter().collect(),
        ];
        assert_eq!(
            notes(&rows).as_deref(),
            Some("Access\nGate 3 only\n\n\n\n\n")
        );
        assert_eq!(notes(&[]), None);
    }

    #[test]
    fn test_planned_task_skips_weekend() {
        let config = ReaderConfig::default();
        let mut decoder = Decoder::new(&config);
        let calendar = decoder.project.add_calendar(weekday_calendar());
        decoder.project.properties_mut().default_calendar = Some(calendar);

        decoder.process_task(
            None,
            task_row(
                STATUS_PLANNED,
                vec![
                    ("PLANNED_START", Value::Date(Some(at(2020, 1, 1, 13)))),
                    ("PLANNED_DURATION", Value::Duration(Duration::from_hours(40.0))),
                ],
            ),
        );

        let task = &decoder.project.tasks()[0];
        assert_eq!(task.start, Some(at(2020, 1, 1, 13)));
        assert_eq!(task.finish, Some(at(2020, 1, 8, 12)));
        assert!(!task.milestone);
        assert_eq!(task.calendar, None);
    }

    #[test]
    fn test_planned_task_without_calendar_uses_elapsed_time() {
        let config = ReaderConfig::default();
        let mut decoder = Decoder::new(&config);
        decoder.process_task(
            None,
            task_row(
                STATUS_PLANNED,
                vec![
                    ("PLANNED_START", Value::Date(Some(at(2020, 1, 4, 8)))),
                    ("PLANNED_DURATION", Value::Duration(Duration::from_hours(30.0))),
                ],
            ),
        );
        assert_eq!(decoder.project.tasks()[0].finish, Some(at(2020, 1, 5, 14)));
    }

    #[test]
    fn test_started_task_falls_back_to_planned_finish() {
        let config = ReaderConfig::default();
        let mut decoder = Decoder::new(&config);
        decoder.process_task(
            None,
            task_row(
                STATUS_STARTED,
                vec![
                    ("ACTUAL_START", Value::Date(Some(at(2020, 1, 2, 8)))),
                    ("PLANNED_FINISH", Value::Date(Some(at(2020, 1, 9, 17)))),
                    ("ESTIMATED_FINISH", Value::Date(None)),
                    ("PERCENT_COMPLETE", Value::Double(40.0)),
                ],
            ),
        );

        let task = &decoder.project.tasks()[0];
        assert_eq!(task.actual_start, Some(at(2020, 1, 2, 8)));
        assert_eq!(task.start, task.actual_start);
        assert_eq!(task.finish, Some(at(2020, 1, 9, 17)));
        assert_eq!(task.percent_complete, Some(40.0));
    }

    #[test]
    fn test_finished_task() {
        let config = ReaderConfig::default();
        let mut decoder = Decoder::new(&config);
        decoder.process_task(
            None,
            task_row(
                STATUS_FINISHED,
                vec![
                    ("ACTUAL_START", Value::Date(Some(at(2020, 1, 2, 8)))),
                    ("ACTUAL_FINISH", Value::Date(Some(at(2020, 1, 3, 17)))),
                    ("PERCENT_COMPLETE", Value::Double(90.0)),
                    ("PLANNED_DURATION", Value::Duration(Duration::ZERO)),
                    ("CONSTRAINT_TYPE", Value::Integer(2)),
                ],
            ),
        );

        let task = &decoder.project.tasks()[0];
        assert_eq!(task.percent_complete, Some(100.0));
        assert_eq!(task.start, Some(at(2020, 1, 2, 8)));
        assert_eq!(task.finish, Some(at(2020, 1, 3, 17)));
        assert!(task.milestone);
        assert_eq!(task.constraint_type, Some(ConstraintType::MustStartOn));
        assert_eq!(task.constraint_date, task.start);
    }

    #[test]
    fn test_calendar_override_only_when_different() {
        let config = ReaderConfig::default();
        let mut decoder = Decoder::new(&config);
        let standard = decoder.project.add_calendar(weekday_calendar());
        let night = decoder.project.add_calendar(Calendar::new());
        decoder.project.properties_mut().default_calendar = Some(standard);
        decoder.calendars.insert(Uuid::from_u64_pair(1, 1), standard);
        decoder.calendars.insert(Uuid::from_u64_pair(2, 2), night);

        for uuid in [Uuid::from_u64_pair(1, 1), Uuid::from_u64_pair(2, 2), Uuid::nil()] {
            decoder.process_task(
                None,
                task_row(0, vec![("CALENDAR_UUID", Value::Uuid(uuid))]),
            );
        }

        let calendars: Vec<_> = decoder.project.tasks().iter().map(|t| t.calendar).collect();
        assert_eq!(calendars, vec![None, Some(night), None]);
    }

    #[test]
    fn test_summary_dates_roll_up() {
        let mut project = ProjectFile::new();
        let parent = project.add_task(None, Task::default());
        let a = project.add_task(
            Some(parent),
            Task {
                start: Some(at(2020, 1, 6, 8)),
                finish: Some(at(2020, 1, 7, 17)),
                ..Task::default()
            },
        );
        let _b = project.add_task(
            Some(parent),
            Task {
                start: Some(at(2020, 1, 2, 8)),
                finish: None,
                ..Task::default()
            },
        );
        let _nested = project.add_task(
            Some(a),
            Task {
                start: Some(at(2020, 1, 8, 8)),
                finish: Some(at(2020, 1, 9, 17)),
                ..Task::default()
            },
        );

        update_dates(&mut project, parent);
        assert_eq!(project.task(a).start, Some(at(2020, 1, 8, 8)));
        assert_eq!(project.task(parent).start, Some(at(2020, 1, 2, 8)));
        assert_eq!(project.task(parent).finish, Some(at(2020, 1, 9, 17)));
    }

    #[test]
    fn test_calendar_day_types() {
        let tuesday = Uuid::from_u64_pair(0x10, 0x20);
        let holiday = Uuid::from_u64_pair(0x30, 0x40);
        let range = |start: NaiveTime, end: NaiveTime| -> MapRow {
            [("START", Value::Time(Some(start))), ("END", Value::Time(Some(end)))]
                .into_iter()
                .collect()
        };
        let day_type = |uuid: Uuid, ranges: Vec<MapRow>| -> MapRow {
            [("UUID", Value::Uuid(uuid)), ("TIME_RANGES", Value::Rows(ranges))]
                .into_iter()
                .collect()
        };

        let row: MapRow = [
            ("UUID", Value::Uuid(Uuid::from_u64_pair(1, 2))),
            ("NAME", Value::String(Some("Site".to_string()))),
            ("TUESDAY_DAY_TYPE", Value::Uuid(tuesday)),
            ("WEDNESDAY_DAY_TYPE", Value::Uuid(Uuid::from_u64_pair(9, 9))),
            (
                "DAY_TYPE_ASSIGNMENTS",
                Value::Rows(vec![
                    [
                        ("DATE", Value::Date(Some(at(2020, 12, 25, 0)))),
                        ("DAY_TYPE_UUID", Value::Uuid(holiday)),
                    ]
                    .into_iter()
                    .collect(),
                    [
                        ("DATE", Value::Date(None)),
                        ("DAY_TYPE_UUID", Value::Uuid(holiday)),
                    ]
                    .into_iter()
                    .collect(),
                ]),
            ),
            (
                "DAY_TYPES",
                Value::Rows(vec![
                    day_type(
                        tuesday,
                        vec![range(hm(8, 0), hm(12, 0)), range(hm(13, 0), hm(17, 0))],
                    ),
                    day_type(holiday, Vec::new()),
                ]),
            ),
        ]
        .into_iter()
        .collect();

        let config = ReaderConfig::default();
        let mut decoder = Decoder::new(&config);
        decoder.process_calendar(&row);

        let calendar = &decoder.project.calendars()[0];
        assert_eq!(calendar.name.as_deref(), Some("Site"));
        assert_eq!(
            calendar.hours(Day::Tuesday),
            Some(
                &[
                    TimeRange::new(hm(8, 0), hm(12, 0)),
                    TimeRange::new(hm(13, 0), hm(17, 0)),
                ][..]
            )
        );
        assert!(!calendar.is_working_day(Day::Wednesday));
        assert!(!calendar.is_working_day(Day::Monday));
        assert_eq!(calendar.exceptions().len(), 1);
        assert!(calendar
            .exception(NaiveDate::from_ymd_opt(2020, 12, 25).unwrap())
            .is_some_and(|e| e.ranges.is_empty()));
        assert_eq!(decoder.calendars.len(), 1);
        assert!(decoder.calendars.contains_key(&Uuid::from_u64_pair(1, 2)));
    }

    #[test]
    fn test_config_builder() {
        let config = ReaderConfig::new()
            .max_table_size(1024)
            .projection_horizon_days(7)
            .max_nesting_depth(16);
        assert_eq!(config.max_table_size, 1024);
        assert_eq!(config.projection_horizon_days, 7);
        assert_eq!(config.max_nesting_depth, 16);
        assert_eq!(ReaderConfig::default().max_nesting_depth, 128);
        assert_eq!(SpReader::with_config(config).config().max_table_size, 1024);
    }

    #[test]
    fn test_invalid_input_is_wrapped() {
        let err = SpReader::new().read(&b"too short"[..]).unwrap_err();
        assert!(err.is_invalid_file());
        assert!(matches!(
            err,
            Error::InvalidFile { ref source } if matches!(**source, Error::Io(_))
        ));
    }
}
