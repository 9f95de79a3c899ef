//! Concrete table schemas.
//!
//! Most fields are undocumented; they are kept as `UNKNOWNn` byte columns so
//! that a diagnostic dump shows everything that was read.

use super::{BlockKind, Field, MapRow, TableKind, TableReader, Value};
use crate::error::{Error, Result};
use crate::stream::StreamReader;
use std::io::Read;
use uuid::Uuid;

/// Row magic numbers
pub(crate) mod magic {
    pub(crate) const CALENDAR: u32 = 0x7FEC_261D;
    pub(crate) const DAY_TYPE: u32 = 0x2C5A_F1B4;
    pub(crate) const DAY_TYPE_ASSIGNMENT: u32 = 0x1D6E_3C90;
    pub(crate) const COMPANY: u32 = 0x0598_BFDA;
    pub(crate) const RESOURCE: u32 = 0x57A8_5C31;
    pub(crate) const RESOURCE_UNKNOWN: u32 = 0x701B_AFBD;
    pub(crate) const USER_FIELD: u32 = 0x440A_7BA3;
    pub(crate) const COMMENTARY: u32 = 0x6A1D_94C3;
    pub(crate) const PREDECESSOR: u32 = 0x04E7_E3D1;
    pub(crate) const RESOURCE_ASSIGNMENT: u32 = 0x0E2C_7F51;
    pub(crate) const TASK: u32 = 0x3B4C_2AD8;
}

/// Calendars. The table trailer is followed by the default calendar's UUID.
#[derive(Debug, Default, Clone)]
pub struct CalendarReader {
    default_calendar: Option<Uuid>,
}

impl CalendarReader {
    /// UUID of the file's default calendar, once the table has been read
    pub fn default_calendar(&self) -> Option<Uuid> {
        self.default_calendar
    }
}

impl TableReader for CalendarReader {
    fn name(&self) -> &'static str {
        "CalendarReader"
    }

    fn row_magic(&self) -> u32 {
        magic::CALENDAR
    }

    fn layout(&self) -> &'static [Field] {
        &[
            Field::String("NAME"),
            Field::UnknownTable("UNKNOWN1", 0, 0),
            Field::Bytes("UNKNOWN2", 4),
            Field::Uuid("SUNDAY_DAY_TYPE"),
            Field::Uuid("MONDAY_DAY_TYPE"),
            Field::Uuid("TUESDAY_DAY_TYPE"),
            Field::Uuid("WEDNESDAY_DAY_TYPE"),
            Field::Uuid("THURSDAY_DAY_TYPE"),
            Field::Uuid("FRIDAY_DAY_TYPE"),
            Field::Uuid("SATURDAY_DAY_TYPE"),
            Field::Bytes("UNKNOWN3", 4),
            Field::Table("DAY_TYPE_ASSIGNMENTS", TableKind::DayTypeAssignment),
            Field::Table("DAY_TYPES", TableKind::DayType),
            Field::Bytes("UNKNOWN4", 8),
        ]
    }

    fn post_trailer<R: Read>(&mut self, stream: &mut StreamReader<'_, R>) -> Result<()> {
        self.default_calendar = Some(stream.read_uuid()?);
        Ok(())
    }
}

/// Named day types owning a list of working time ranges
#[derive(Debug, Default, Clone, Copy)]
pub struct DayTypeReader;

impl TableReader for DayTypeReader {
    fn name(&self) -> &'static str {
        "DayTypeReader"
    }

    fn row_magic(&self) -> u32 {
        magic::DAY_TYPE
    }

    fn layout(&self) -> &'static [Field] {
        &[
            Field::String("NAME"),
            Field::Bytes("UNKNOWN1", 16),
            Field::Blocks("TIME_RANGES", BlockKind::TimeRange),
            Field::Bytes("UNKNOWN2", 4),
        ]
    }
}

/// Dated calendar exceptions referencing a day type
#[derive(Debug, Default, Clone, Copy)]
pub struct DayTypeAssignmentReader;

impl TableReader for DayTypeAssignmentReader {
    fn name(&self) -> &'static str {
        "DayTypeAssignmentReader"
    }

    fn row_magic(&self) -> u32 {
        magic::DAY_TYPE_ASSIGNMENT
    }

    fn has_uuid(&self) -> bool {
        false
    }

    fn layout(&self) -> &'static [Field] {
        &[Field::Date("DATE"), Field::Uuid("DAY_TYPE_UUID")]
    }
}

/// Companies, each owning a resource hierarchy
#[derive(Debug, Default, Clone, Copy)]
pub struct CompanyReader;

impl TableReader for CompanyReader {
    fn name(&self) -> &'static str {
        "CompanyReader"
    }

    fn row_magic(&self) -> u32 {
        magic::COMPANY
    }

    fn layout(&self) -> &'static [Field] {
        &[
            Field::Bytes("UNKNOWN1", 20),
            Field::Table("RESOURCES", TableKind::Resource),
            Field::String("NAME"),
            Field::String("ADDRESS"),
            Field::String("PHONE"),
            Field::String("FAX"),
            Field::String("EMAIL"),
            Field::Bytes("UNKNOWN2", 12),
            Field::String("URL"),
            Field::Bytes("UNKNOWN3", 8),
        ]
    }
}

/// Resources, nested recursively through `RESOURCES`
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceReader;

impl TableReader for ResourceReader {
    fn name(&self) -> &'static str {
        "ResourceReader"
    }

    fn row_magic(&self) -> u32 {
        magic::RESOURCE
    }

    fn layout(&self) -> &'static [Field] {
        &[
            Field::String("NAME"),
            Field::String("DESCRIPTION"),
            Field::Integer("SUPPLY_REFERENCE_FLAG"),
            Field::Flagged(
                "SUPPLY_REFERENCE_FLAG",
                &[Field::String("SUPPLY_REFERENCE")],
            ),
            Field::Bytes("UNKNOWN1", 48),
            Field::Table("RESOURCES", TableKind::Resource),
            Field::Bytes("UNKNOWN2", 20),
            Field::String("URL"),
            Field::TableConditional("USER_FIELDS", TableKind::UserField),
            Field::String("ID"),
            Field::String("EMAIL"),
            // rows of this table contain nested tables of their own
            Field::Versioned {
                legacy: &[Field::UnknownTable("UNKNOWN3", 64, magic::RESOURCE_UNKNOWN)],
                current: &[Field::UnknownTable("UNKNOWN3", 56, magic::RESOURCE_UNKNOWN)],
            },
            Field::Bytes("UNKNOWN4", 30),
            Field::TableConditional("COMMENTARY", TableKind::Commentary),
            Field::Bytes("UNKNOWN5", 48),
            Field::Integer("UNKNOWN6_FLAG"),
            Field::Flagged(
                "UNKNOWN6_FLAG",
                &[
                    Field::Bytes("UNKNOWN6", 70),
                    Field::String("UNKNOWN7"),
                    Field::Bytes("UNKNOWN8", 4),
                ],
            ),
            Field::Bytes("UNKNOWN9", 12),
            Field::Versioned {
                legacy: &[],
                current: &[Field::Bytes("UNKNOWN10", 12)],
            },
            Field::Integer("UNIQUE_ID"),
        ]
    }
}

/// User field values attached to resources and tasks
#[derive(Debug, Default, Clone, Copy)]
pub struct UserFieldReader;

impl TableReader for UserFieldReader {
    fn name(&self) -> &'static str {
        "UserFieldReader"
    }

    fn row_magic(&self) -> u32 {
        magic::USER_FIELD
    }

    fn has_uuid(&self) -> bool {
        false
    }

    fn layout(&self) -> &'static [Field] {
        &[Field::Versioned {
            legacy: &[
                Field::Bytes("UNKNOWN1", 16),
                Field::String("VALUE"),
                Field::Bytes("UNKNOWN2", 26),
            ],
            current: &[Field::String("VALUE"), Field::Bytes("UNKNOWN1", 26)],
        }]
    }
}

/// Titled notes attached to resources and tasks
#[derive(Debug, Default, Clone, Copy)]
pub struct CommentaryReader;

impl TableReader for CommentaryReader {
    fn name(&self) -> &'static str {
        "CommentaryReader"
    }

    fn row_magic(&self) -> u32 {
        magic::COMMENTARY
    }

    fn has_uuid(&self) -> bool {
        false
    }

    fn layout(&self) -> &'static [Field] {
        &[Field::String("TITLE"), Field::String("TEXT")]
    }
}

/// Task dependencies. `LAG` is unsigned; `LAG_SIGN == 2` marks a negative lag.
#[derive(Debug, Default, Clone, Copy)]
pub struct PredecessorReader;

impl TableReader for PredecessorReader {
    fn name(&self) -> &'static str {
        "PredecessorReader"
    }

    fn row_magic(&self) -> u32 {
        magic::PREDECESSOR
    }

    fn layout(&self) -> &'static [Field] {
        &[
            Field::Uuid("PREDECESSOR_UUID"),
            Field::Integer("RELATION_TYPE"),
            Field::Bytes("UNKNOWN1", 4),
            Field::Duration("LAG"),
            Field::Bytes("UNKNOWN2", 4),
            Field::Integer("LAG_SIGN"),
            Field::Uuid("CALENDAR_UUID"),
            Field::Bytes("UNKNOWN3", 8),
        ]
    }
}

/// Resources assigned to a task
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceAssignmentReader;

impl TableReader for ResourceAssignmentReader {
    fn name(&self) -> &'static str {
        "ResourceAssignmentReader"
    }

    fn row_magic(&self) -> u32 {
        magic::RESOURCE_ASSIGNMENT
    }

    fn layout(&self) -> &'static [Field] {
        &[Field::Uuid("RESOURCE_UUID"), Field::Bytes("UNKNOWN1", 12)]
    }
}

/// Tasks, nested recursively through `TASKS`
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskReader;

impl TableReader for TaskReader {
    fn name(&self) -> &'static str {
        "TaskReader"
    }

    fn row_magic(&self) -> u32 {
        magic::TASK
    }

    fn layout(&self) -> &'static [Field] {
        &[
            Field::String("NAME"),
            Field::String("ID"),
            Field::Bytes("UNKNOWN1", 16),
            Field::Table("TASKS", TableKind::Task),
            Field::Table("PREDECESSORS", TableKind::Predecessor),
            Field::Table("RESOURCE_ASSIGNMENTS", TableKind::ResourceAssignment),
            Field::Integer("STATUS"),
            Field::Date("PLANNED_START"),
            Field::Date("PLANNED_FINISH"),
            Field::Duration("PLANNED_DURATION"),
            Field::Duration("REMAINING_DURATION"),
            Field::Date("ACTUAL_START"),
            Field::Date("ACTUAL_FINISH"),
            Field::Date("ESTIMATED_FINISH"),
            Field::Double("PERCENT_COMPLETE"),
            Field::Integer("CONSTRAINT_TYPE"),
            Field::Date("CONSTRAINT_EARLY_DATE"),
            Field::Date("CONSTRAINT_LATE_DATE"),
            Field::Uuid("CALENDAR_UUID"),
            Field::String("URL"),
            Field::TableConditional("USER_FIELDS", TableKind::UserField),
            Field::TableConditional("COMMENTARY", TableKind::Commentary),
            Field::Versioned {
                legacy: &[Field::Bytes("UNKNOWN2", 16)],
                current: &[Field::Bytes("UNKNOWN2", 8), Field::Bytes("UNKNOWN3", 12)],
            },
        ]
    }
}

/// Framed table of undocumented fixed-size rows.
///
/// A row size of zero declares a table that is expected to be empty; any
/// record in it is an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnknownTableReader {
    row_size: usize,
    row_magic: u32,
}

impl UnknownTableReader {
    /// Creates a reader for rows of `row_size` bytes preceded by `row_magic`
    pub fn new(row_size: usize, row_magic: u32) -> Self {
        Self {
            row_size,
            row_magic,
        }
    }
}

impl TableReader for UnknownTableReader {
    fn name(&self) -> &'static str {
        "UnknownTableReader"
    }

    fn row_magic(&self) -> u32 {
        self.row_magic
    }

    fn has_uuid(&self) -> bool {
        false
    }

    fn read_row<R: Read>(
        &mut self,
        stream: &mut StreamReader<'_, R>,
        row: &mut MapRow,
    ) -> Result<()> {
        if self.row_size == 0 {
            return Err(Error::UnexpectedRecords {
                magic: self.row_magic,
            });
        }
        row.put("UNKNOWN1", Value::Bytes(stream.read_bytes(self.row_size)?));
        Ok(())
    }
}
