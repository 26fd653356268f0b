//! 📦 Common data structures, the building blocks of csvx.
//!
//! 🎬 INT. UPLOAD BUCKET. A CSV arrives. It has eleven columns, a header
//! nobody reads, and one row near the bottom where somebody typed "free" into
//! the price column. Every row in here gets the same treatment: split into
//! fields, packed into a [`Batch`], shipped to a worker, and either promoted
//! to a [`DeviceRecord`] or politely shown the door. 🦆
//!
//! Ownership is a one-way street. A [`RawRow`] belongs to the batcher until it
//! lands in a [`Batch`]. A [`Batch`] belongs to exactly one worker until it is
//! consumed. Nothing here is pooled, recycled, or reused.

/// 🔢 Every device row has exactly this many positional fields. Not ten. Not twelve.
pub const EXPECTED_FIELD_COUNT: usize = 11;

/// 📄 One line of the input, split into fields and nothing more.
///
/// `row_number` is 1-based and counts data rows only (the header does not
/// get a number, it has not earned one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub row_number: u64,
    pub fields: Vec<String>,
}

impl RawRow {
    pub fn new(row_number: u64, fields: Vec<String>) -> Self {
        Self { row_number, fields }
    }

    /// 📏 How many fields the parser found on this line.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// 📦 A bounded, ordered group of rows that is validated and inserted as one unit.
///
/// `seq` is 1-based in emission order: batch #1 is the first one the batcher
/// let go of. Workers may insert batches out of order, the sequence number is
/// how the logs (and the report) tell them apart afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub seq: u64,
    pub rows: Vec<RawRow>,
}

impl Batch {
    pub fn new(seq: u64, rows: Vec<RawRow>) -> Self {
        Self { seq, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// 🎯 A row that survived validation, projected into the target schema.
///
/// Field 0 of the source row (id-like, unused) is dropped on the floor. The
/// store hands out its own ids. Everything else is copied verbatim except
/// `price`, which had to prove it was a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub device_name: String,
    pub device_type: String,
    pub brand: String,
    pub model: String,
    pub os: String,
    pub os_version: String,
    pub purchase_date: String,
    pub warranty_end: String,
    pub status: String,
    /// 💰 Never negative. Held as `i64` to match the BIGINT column.
    pub price: i64,
}
