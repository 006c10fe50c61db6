//! Reconciliation of a saves table against the setup it was generated for.
//!
//! Each record of the table holds a queue that followed the setup, the pieces left unused by
//! each way of solving it and the fumens of those solutions. The reader turns a record into the
//! save alternatives a player actually ends up with: the unused piece plus whatever part of the
//! last bag was never seen.

use std::collections::HashMap;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::SavesConfig;
use crate::error::{DataError, ParseError, Result};
use crate::formulas::{bag_composition, pc_num_to_leftover_len, PC_SIZE};
use crate::fumen::{comments, Fumen, FumenCodec};
use crate::piece::{multiset_difference, positive_part, Piece, Queue, BAG};

/// Column of the queue following the setup.
pub const COLUMN_QUEUE: &str = "ツモ";
/// Column of the number of fumens.
pub const COLUMN_FUMEN_COUNT: &str = "対応地形数";
/// Column of the pieces used by each solution.
pub const COLUMN_USED_PIECES: &str = "使用ミノ";
/// Column of the piece each solution leaves unused.
pub const COLUMN_UNUSED_PIECES: &str = "未使用ミノ";
/// Column of the solution fumens.
pub const COLUMN_FUMENS: &str = "テト譜";
/// Separator of multiple entries within one cell.
pub const COLUMN_DELIMITER: char = ';';

const REQUIRED_COLUMNS: [&str; 3] = [COLUMN_QUEUE, COLUMN_UNUSED_PIECES, COLUMN_FUMENS];

#[derive(Debug, Deserialize)]
struct SavesRecord {
    #[serde(rename = "ツモ")]
    queue: String,
    #[serde(rename = "未使用ミノ")]
    unused: String,
    #[serde(rename = "テト譜")]
    fumens: String,
}

/// One reconciled record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SavesRow {
    /// The queue that followed the setup.
    pub queue: Queue,
    /// False when the record lists no solution.
    pub solveable: bool,
    /// Rank-sorted save alternatives, one per unused piece entry.
    pub saves: Vec<Queue>,
    /// Fumens realizing each alternative, when requested.
    pub fumens: Option<Vec<Vec<Fumen>>>,
    /// The raw record, when requested.
    pub line: Option<StringRecord>,
}

/// Bulk-loaded saves table plus the per-setup values every row needs.
#[derive(Debug)]
pub struct SavesReader {
    config: SavesConfig,
    build: Queue,
    unused_last_bag: Vec<Piece>,
    leading_size: usize,
    headers: StringRecord,
    records: Vec<StringRecord>,
}

impl SavesReader {
    /// Read `path` and load it like [`SavesReader::from_text`].
    pub fn from_path(config: SavesConfig, path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(DataError::from)?;
        Self::from_text(config, &text)
    }

    /// Load every record of `text` and check the header for the required columns.
    pub fn from_text(config: SavesConfig, text: &str) -> Result<Self> {
        if !(1..=9).contains(&config.pc_num) {
            return Err(DataError::PcNumber(config.pc_num).into());
        }
        let build: Queue = config.build.parse()?;
        let leftover: Queue = config.leftover.parse()?;

        let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(text.as_bytes());
        let headers = csv_reader.headers().map_err(DataError::from)?.clone();
        let missing = REQUIRED_COLUMNS.iter()
            .filter(|column| !headers.iter().any(|header| header == **column))
            .map(|column| column.to_string())
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(DataError::MissingColumns(missing).into());
        }
        let records = csv_reader.records().collect::<std::result::Result<Vec<_>, _>>().map_err(DataError::from)?;

        let composition = bag_composition(
            pc_num_to_leftover_len(config.pc_num),
            if config.twoline { PC_SIZE / 2 + 1 } else { PC_SIZE + 1 },
        );
        let unused_last_bag = unused_last_bag(&build, &leftover, &composition);
        let leading_size = composition[..composition.len() - 1].iter().sum::<usize>().max(build.len());
        debug!(?composition, unused = %Queue::new(unused_last_bag.clone()), leading_size, records = records.len(), "loaded saves table");

        Ok(Self { config, build, unused_last_bag, leading_size, headers, records })
    }

    /// The setup this table belongs to.
    pub fn config(&self) -> &SavesConfig {
        &self.config
    }

    /// Header record of the table.
    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows without fumen association, starting from the first record.
    pub fn read(&self) -> Rows<'_> {
        Rows { reader: self, codec: None, assign_line: false, position: 0, labels: HashMap::new(), failed: false }
    }

    /// Rows with the fumens of each save alternative.
    ///
    /// A fumen belongs to an alternative when the sum of the character codes of the row queue
    /// minus the sum of those of the fumen's first comment is the code of the alternative.
    /// This relies on single-piece alternatives and on no two solutions sharing a checksum.
    pub fn read_with_fumens<'r>(&'r self, codec: &'r dyn FumenCodec) -> Rows<'r> {
        Rows { codec: Some(codec), ..self.read() }
    }

    fn valid_length(&self, length: usize) -> bool {
        let hold = self.config.hold;
        length == PC_SIZE
            || length == PC_SIZE + hold
            || (self.config.twoline && (length == PC_SIZE / 2 || length == PC_SIZE / 2 + hold))
    }
}

/// Pieces of the last bag the setup leaves unplaced.
fn unused_last_bag(build: &Queue, leftover: &Queue, composition: &[usize]) -> Vec<Piece> {
    let earlier = if composition.len() < 3 {
        leftover.clone()
    } else {
        leftover.concat(&Queue::new(BAG.to_vec()))
    };
    let used_last_bag = positive_part(&multiset_difference(build, &earlier));
    positive_part(&multiset_difference(&Queue::new(BAG.to_vec()), &used_last_bag)).pieces().to_vec()
}

/// Lazy pass over the records of a [`SavesReader`].
///
/// Yields at most one error, after which the iterator is exhausted.
pub struct Rows<'r> {
    reader: &'r SavesReader,
    codec: Option<&'r dyn FumenCodec>,
    assign_line: bool,
    position: usize,
    // fumen -> character code sum of its first comment
    labels: HashMap<Fumen, u32>,
    failed: bool,
}

impl Rows<'_> {
    /// Attach the raw record to every row.
    pub fn with_lines(mut self) -> Self {
        self.assign_line = true;
        self
    }

    fn parse_queue(&self, value: &str) -> Result<Queue> {
        value.parse().map_err(|source: ParseError| {
            DataError::InvalidQueue { value: value.to_string(), record: self.position, source }.into()
        })
    }

    fn label(&mut self, codec: &dyn FumenCodec, fumen: &Fumen) -> Result<u32> {
        if let Some(label) = self.labels.get(fumen) {
            return Ok(*label);
        }
        let label = comments(codec, fumen)?
            .first()
            .map_or(0, |comment| comment.chars().map(|c| c as u32).sum());
        self.labels.insert(fumen.clone(), label);
        Ok(label)
    }

    fn row(&mut self, record: &StringRecord) -> Result<SavesRow> {
        let reader = self.reader;
        let fields: SavesRecord = record.deserialize(Some(&reader.headers)).map_err(DataError::from)?;
        let queue = self.parse_queue(&fields.queue)?;
        let line = self.assign_line.then(|| record.clone());

        if fields.fumens.is_empty() {
            return Ok(SavesRow {
                queue,
                solveable: false,
                saves: Vec::new(),
                fumens: self.codec.map(|_| Vec::new()),
                line,
            });
        }

        let full_queue = reader.build.concat(&queue);
        if !reader.valid_length(full_queue.len()) {
            return Err(DataError::QueueLength {
                build: reader.config.build.clone(),
                length: full_queue.len(),
                lines: if reader.config.twoline { 2 } else { 4 },
            }.into());
        }

        let seen = full_queue.slice(reader.leading_size, full_queue.len());
        let unseen = reader.unused_last_bag.iter().copied().filter(|piece| !seen.contains(*piece)).collect::<Queue>();
        let queue_value = queue.char_code_sum() as i64;
        let row_fumens = fields.fumens.split(COLUMN_DELIMITER).map(Fumen::from).collect::<Vec<_>>();

        let mut saves = Vec::new();
        let mut fumens = Vec::new();
        for alternative in fields.unused.split(COLUMN_DELIMITER) {
            saves.push(unseen.concat(&self.parse_queue(alternative)?).sorted());

            if let Some(codec) = self.codec {
                let mut matching = Vec::new();
                for fumen in &row_fumens {
                    let label = self.label(codec, fumen)? as i64;
                    // difference taken as a UTF-16 code unit
                    let recovered = char::from_u32((queue_value - label).rem_euclid(1 << 16) as u32);
                    if recovered.is_some_and(|c| alternative.chars().eq(std::iter::once(c))) {
                        matching.push(fumen.clone());
                    }
                }
                fumens.push(matching);
            }
        }

        if self.codec.is_some() && fumens.iter().all(Vec::is_empty) {
            warn!(queue = %queue, "no fumen matched any save alternative");
        }

        Ok(SavesRow { queue, solveable: true, saves, fumens: self.codec.map(|_| fumens), line })
    }
}

impl Iterator for Rows<'_> {
    type Item = Result<SavesRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let record = self.reader.records.get(self.position)?;
        self.position += 1;
        let row = self.row(record);
        if let Err(error) = &row {
            debug!(record = self.position, %error, "saves table row failed");
            self.failed = true;
        }
        Some(row)
    }
}
