//! Upstream tables feeding the cost model.
//!
//! Two producers sit outside the search: the detector, which yields per-image
//! class probabilities, and the label files, which yield per-image presence
//! flags. This module reads and writes both as simple comma-separated tables,
//! derives them from raw detections / label records, and inner-joins them on
//! the image name into an [`EvaluationTable`].
//!
//! A class with no detections gets probability exactly 0.0, which cannot be
//! told apart from a detection with vanishing confidence. That is a property
//! of the upstream aggregation and is kept as-is.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::classes::{DamageClass, CLASS_COUNT};
use crate::error::{Error, InputError, Result};
use crate::fitness::{EvaluationRow, EvaluationTable};

/// header of the probability column holding the detector's argmax class
const PREDICTED_CLASS_COLUMN: &str = "predicted_class";
const IMAGE_COLUMN: &str = "image";

/// one detected box: class id as emitted by the detector, and its confidence
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub class_id: i64,
    pub confidence: f64,
}

/// per-image class probabilities, in producer order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProbabilityTable {
    rows: Vec<(String, [f64; CLASS_COUNT])>,
}

/// per-image ground-truth flags, in producer order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroundTruthTable {
    rows: Vec<(String, [bool; CLASS_COUNT])>,
}

/// how many rows survived the inner join
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JoinStats {
    pub joined: usize,
    pub unmatched_probabilities: usize,
    pub unmatched_labels: usize,
}

impl ProbabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, image: impl Into<String>, probabilities: [f64; CLASS_COUNT]) {
        self.rows.push((image.into(), probabilities));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[(String, [f64; CLASS_COUNT])] {
        &self.rows
    }

    /// mean confidence per class over each image's detections; 0.0 for classes
    /// with no detection. boxes with an unknown class id are ignored.
    pub fn from_detections<I, S, D>(images: I) -> Self
    where
        I: IntoIterator<Item = (S, D)>,
        S: Into<String>,
        D: IntoIterator<Item = Detection>,
    {
        profiling::scope!("ProbabilityTable::from_detections");
        let mut table = Self::new();
        for (image, detections) in images {
            let mut sums = [0.0f64; CLASS_COUNT];
            let mut counts = [0u32; CLASS_COUNT];
            for det in detections {
                if let Some(class) = DamageClass::from_index(det.class_id) {
                    sums[class.index()] += det.confidence;
                    counts[class.index()] += 1;
                }
            }
            let means = std::array::from_fn(|i| if counts[i] > 0 { sums[i] / counts[i] as f64 } else { 0.0 });
            table.push(image, means);
        }
        table
    }

    /// parse `image,...,D00_prob,D10_prob,D20_prob,D40_prob`; other columns are ignored
    pub fn from_csv_str(text: &str) -> Result<Self, InputError> {
        let mut lines = data_lines(text);
        let (_, header) = lines.next().ok_or(InputError::EmptyTable)?;
        let header = split_record(header);
        let image_col = column_index(&header, IMAGE_COLUMN)?;
        let class_cols = class_columns(&header, |c| c.prob_column())?;

        let mut table = Self::new();
        for (line_no, line) in lines {
            let fields = record_fields(line, line_no, header.len())?;
            let image = fields[image_col];
            let mut probabilities = [0.0; CLASS_COUNT];
            for class in DamageClass::ALL {
                let raw = fields[class_cols[class.index()]];
                if raw.is_empty() {
                    return Err(InputError::missing_value(image, class));
                }
                probabilities[class.index()] = raw
                    .parse::<f64>()
                    .map_err(|_| InputError::invalid_probability(image, class, raw))?;
            }
            table.push(image, probabilities);
        }
        Ok(table)
    }

    /// header: `image,predicted_class,D00_prob,...`; predicted_class is the argmax (first on ties)
    pub fn to_csv_string(&self) -> String {
        let mut out = format!("{IMAGE_COLUMN},{PREDICTED_CLASS_COLUMN}");
        for class in DamageClass::ALL {
            out.push(',');
            out.push_str(&class.prob_column());
        }
        out.push('\n');
        for (image, probs) in &self.rows {
            let argmax = probs
                .iter()
                .enumerate()
                .fold(0, |best, (i, &p)| if p > probs[best] { i } else { best });
            out.push_str(&format!("{image},{argmax}"));
            for p in probs {
                out.push_str(&format!(",{p}"));
            }
            out.push('\n');
        }
        out
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let table = Self::from_csv_str(&text)?;
        debug!(path = %path.display(), rows = table.len(), "loaded probability table");
        Ok(table)
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_csv_string()).map_err(|e| Error::io(path, e))
    }
}

impl GroundTruthTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, image: impl Into<String>, flags: [bool; CLASS_COUNT]) {
        self.rows.push((image.into(), flags));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[(String, [bool; CLASS_COUNT])] {
        &self.rows
    }

    /// parse `image,D00,D10,D20,D40` with 0/1 values
    pub fn from_csv_str(text: &str) -> Result<Self, InputError> {
        let mut lines = data_lines(text);
        let (_, header) = lines.next().ok_or(InputError::EmptyTable)?;
        let header = split_record(header);
        let image_col = column_index(&header, IMAGE_COLUMN)?;
        let class_cols = class_columns(&header, |c| c.name().to_owned())?;

        let mut table = Self::new();
        for (line_no, line) in lines {
            let fields = record_fields(line, line_no, header.len())?;
            let image = fields[image_col];
            let mut flags = [false; CLASS_COUNT];
            for class in DamageClass::ALL {
                flags[class.index()] = match fields[class_cols[class.index()]] {
                    "" => return Err(InputError::missing_value(image, class)),
                    "0" => false,
                    "1" => true,
                    other => return Err(InputError::invalid_flag(image, class, other)),
                };
            }
            table.push(image, flags);
        }
        Ok(table)
    }

    pub fn to_csv_string(&self) -> String {
        let mut out = String::from(IMAGE_COLUMN);
        for class in DamageClass::ALL {
            out.push(',');
            out.push_str(class.name());
        }
        out.push('\n');
        for (image, flags) in &self.rows {
            out.push_str(image);
            for &f in flags {
                out.push_str(if f { ",1" } else { ",0" });
            }
            out.push('\n');
        }
        out
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let table = Self::from_csv_str(&text)?;
        debug!(path = %path.display(), rows = table.len(), "loaded ground-truth table");
        Ok(table)
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_csv_string()).map_err(|e| Error::io(path, e))
    }

    /// build flags from a directory of `<stem>.txt` label files (one box per line,
    /// first token the class id). the image for `<stem>.txt` is `<stem>.jpg`.
    /// files are visited in name order so the table is deterministic.
    pub fn from_label_dir(dir: impl AsRef<Path>) -> Result<Self> {
        profiling::scope!("GroundTruthTable::from_label_dir");
        let dir = dir.as_ref();
        let mut files: Vec<_> = fs::read_dir(dir)
            .map_err(|e| Error::io(dir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        files.sort();

        let mut table = Self::new();
        for path in files {
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            let text = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
            let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let flags = parse_label_records(&file_name, &text)?;
            table.push(format!("{stem}.jpg"), flags);
        }
        info!(dir = %dir.display(), images = table.len(), "built ground truth from label files");
        Ok(table)
    }
}

/// presence flags from one label file. any record of a class sets its flag,
/// however many boxes there are; unknown class ids are skipped.
pub fn parse_label_records(file: &str, text: &str) -> Result<[bool; CLASS_COUNT], InputError> {
    let mut flags = [false; CLASS_COUNT];
    for (i, line) in text.lines().enumerate() {
        let Some(first) = line.split_whitespace().next() else {
            continue;
        };
        let class_id: i64 = first.parse().map_err(|_| InputError::MalformedLabel {
            file: file.to_owned(),
            line: i + 1,
        })?;
        if let Some(class) = DamageClass::from_index(class_id) {
            flags[class.index()] = true;
        }
    }
    Ok(flags)
}

/// inner join on image name, keeping probability-table order.
/// images present in only one table are dropped and counted.
///
/// unlike a relational join, a ground-truth image listed twice contributes only
/// its first row (a second row is logged and skipped). tables built by
/// [`GroundTruthTable::from_label_dir`] hold one row per label file, so this only
/// matters for hand-written ground-truth CSVs.
pub fn join(probabilities: &ProbabilityTable, truth: &GroundTruthTable) -> Result<(EvaluationTable, JoinStats), InputError> {
    profiling::scope!("join");
    let mut by_image: HashMap<&str, [bool; CLASS_COUNT]> = HashMap::with_capacity(truth.len());
    for (image, flags) in truth.rows() {
        if by_image.contains_key(image.as_str()) {
            warn!(image = %image, "duplicate ground-truth row, keeping the first");
            continue;
        }
        by_image.insert(image.as_str(), *flags);
    }

    let mut stats = JoinStats::default();
    let mut matched_labels = std::collections::HashSet::with_capacity(by_image.len());
    let mut rows = Vec::with_capacity(probabilities.len().min(by_image.len()));
    for (image, probs) in probabilities.rows() {
        match by_image.get(image.as_str()) {
            Some(flags) => {
                matched_labels.insert(image.as_str());
                rows.push(EvaluationRow {
                    image: image.clone(),
                    probabilities: *probs,
                    flags: *flags,
                });
            }
            None => stats.unmatched_probabilities += 1,
        }
    }
    stats.joined = rows.len();
    stats.unmatched_labels = by_image.len() - matched_labels.len();

    let table = EvaluationTable::from_rows(rows)?;
    if stats.unmatched_probabilities > 0 || stats.unmatched_labels > 0 {
        warn!(
            unmatched_probabilities = stats.unmatched_probabilities,
            unmatched_labels = stats.unmatched_labels,
            "rows dropped by join"
        );
    }
    info!(rows = stats.joined, "joined probabilities with ground truth");
    Ok((table, stats))
}

// ---- csv helpers --------------------------------------------------------

/// non-blank lines with 1-based line numbers
fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end_matches('\r')))
        .filter(|(_, l)| !l.trim().is_empty())
}

fn split_record(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

fn record_fields(line: &str, line_no: usize, expected: usize) -> Result<Vec<&str>, InputError> {
    let fields = split_record(line);
    if fields.len() != expected {
        return Err(InputError::malformed_row(
            line_no,
            format!("expected {expected} fields, found {}", fields.len()),
        ));
    }
    Ok(fields)
}

fn column_index(header: &[&str], name: &str) -> Result<usize, InputError> {
    header
        .iter()
        .position(|h| *h == name)
        .ok_or_else(|| InputError::MissingColumn { column: name.to_owned() })
}

fn class_columns(header: &[&str], name: impl Fn(DamageClass) -> String) -> Result<[usize; CLASS_COUNT], InputError> {
    let mut cols = [0; CLASS_COUNT];
    for class in DamageClass::ALL {
        cols[class.index()] = column_index(header, &name(class))?;
    }
    Ok(cols)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBS_CSV: &str = "\
image,predicted_class,D00_prob,D10_prob,D20_prob,D40_prob
a.jpg,0,0.8,0.0,0.0,0.1
b.jpg,1,0.0,0.7,0.0,0.0
c.jpg,3,0.0,0.0,0.2,0.9
";

    const TRUTH_CSV: &str = "\
image,D00,D10,D20,D40
c.jpg,0,0,1,1
a.jpg,1,0,0,0
z.jpg,0,1,0,0
";

    #[test]
    fn test_parse_probability_csv() {
        let t = ProbabilityTable::from_csv_str(PROBS_CSV).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.rows()[2], ("c.jpg".to_owned(), [0.0, 0.0, 0.2, 0.9]));
    }

    #[test]
    fn test_probability_csv_column_order_is_free() {
        let csv = "D40_prob,D20_prob,image,D10_prob,D00_prob\n0.4,0.3,x.jpg,0.2,0.1\n";
        let t = ProbabilityTable::from_csv_str(csv).unwrap();
        assert_eq!(t.rows()[0].1, [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_probability_csv_errors() {
        let missing_col = "image,D00_prob,D10_prob,D20_prob\na.jpg,0.1,0.2,0.3\n";
        assert!(matches!(
            ProbabilityTable::from_csv_str(missing_col),
            Err(InputError::MissingColumn { column }) if column == "D40_prob"
        ));

        let empty_cell = "image,D00_prob,D10_prob,D20_prob,D40_prob\na.jpg,0.1,,0.3,0.4\n";
        assert!(matches!(
            ProbabilityTable::from_csv_str(empty_cell),
            Err(InputError::MissingValue { class: DamageClass::D10, .. })
        ));

        let bad_number = "image,D00_prob,D10_prob,D20_prob,D40_prob\na.jpg,0.1,x,0.3,0.4\n";
        assert!(matches!(
            ProbabilityTable::from_csv_str(bad_number),
            Err(InputError::InvalidProbability { .. })
        ));

        let short_row = "image,D00_prob,D10_prob,D20_prob,D40_prob\na.jpg,0.1,0.2\n";
        assert!(matches!(
            ProbabilityTable::from_csv_str(short_row),
            Err(InputError::MalformedRow { line: 2, .. })
        ));

        assert!(matches!(ProbabilityTable::from_csv_str(""), Err(InputError::EmptyTable)));
    }

    #[test]
    fn test_truth_csv_flags() {
        let t = GroundTruthTable::from_csv_str(TRUTH_CSV).unwrap();
        assert_eq!(t.rows()[0], ("c.jpg".to_owned(), [false, false, true, true]));

        let bad = "image,D00,D10,D20,D40\na.jpg,0,2,0,0\n";
        assert!(matches!(
            GroundTruthTable::from_csv_str(bad),
            Err(InputError::InvalidFlag { class: DamageClass::D10, .. })
        ));
    }

    #[test]
    fn test_csv_writers_read_back() {
        let probs = ProbabilityTable::from_csv_str(PROBS_CSV).unwrap();
        assert_eq!(ProbabilityTable::from_csv_str(&probs.to_csv_string()).unwrap(), probs);
        assert!(probs.to_csv_string().contains("c.jpg,3,0,0,0.2,0.9"));

        let truth = GroundTruthTable::from_csv_str(TRUTH_CSV).unwrap();
        assert_eq!(truth.to_csv_string(), TRUTH_CSV);
    }

    #[test]
    fn test_inner_join_keeps_probability_order() {
        let probs = ProbabilityTable::from_csv_str(PROBS_CSV).unwrap();
        let truth = GroundTruthTable::from_csv_str(TRUTH_CSV).unwrap();
        let (table, stats) = join(&probs, &truth).unwrap();

        assert_eq!(table.images(), &["a.jpg".to_owned(), "c.jpg".to_owned()]);
        assert_eq!(
            stats,
            JoinStats {
                joined: 2,
                unmatched_probabilities: 1,
                unmatched_labels: 1,
            }
        );
        let c = table.row(1).unwrap();
        assert_eq!(c.flags, [false, false, true, true]);
        assert_eq!(c.probabilities, [0.0, 0.0, 0.2, 0.9]);
    }

    #[test]
    fn test_join_keeps_first_duplicate_truth_row() {
        let mut probs = ProbabilityTable::new();
        probs.push("a.jpg", [0.9, 0.0, 0.0, 0.0]);
        let mut truth = GroundTruthTable::new();
        truth.push("a.jpg", [true, false, false, false]);
        truth.push("a.jpg", [false, true, false, false]);

        let (table, stats) = join(&probs, &truth).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(stats.joined, 1);
        assert_eq!(stats.unmatched_labels, 0);
        assert_eq!(table.row(0).unwrap().flags, [true, false, false, false]);
    }

    #[test]
    fn test_join_with_no_overlap_is_empty() {
        let mut probs = ProbabilityTable::new();
        probs.push("a.jpg", [0.1; 4]);
        let mut truth = GroundTruthTable::new();
        truth.push("b.jpg", [true; 4]);
        let (table, stats) = join(&probs, &truth).unwrap();
        assert!(table.is_empty());
        assert_eq!(stats.joined, 0);
    }

    #[test]
    fn test_label_records() {
        let text = "0 0.5 0.5 0.1 0.1\n0 0.2 0.2 0.1 0.1\n\n3 0.4 0.4 0.2 0.2\n7 0.1 0.1 0.1 0.1\n";
        assert_eq!(parse_label_records("a.txt", text).unwrap(), [true, false, false, true]);
        assert_eq!(parse_label_records("empty.txt", "").unwrap(), [false; 4]);

        let err = parse_label_records("bad.txt", "1 0.1 0.1 0.1 0.1\nD20 0.1\n").unwrap_err();
        assert!(matches!(err, InputError::MalformedLabel { line: 2, .. }));
    }

    #[test]
    fn test_label_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "2 0.5 0.5 0.1 0.1\n").unwrap();
        fs::write(dir.path().join("a.txt"), "1 0.5 0.5 0.1 0.1\n1 0.3 0.3 0.1 0.1\n").unwrap();
        fs::write(dir.path().join("empty.txt"), "").unwrap();
        fs::write(dir.path().join("notes.md"), "0 ignored").unwrap();

        let t = GroundTruthTable::from_label_dir(dir.path()).unwrap();
        assert_eq!(
            t.rows(),
            &[
                ("a.jpg".to_owned(), [false, true, false, false]),
                ("b.jpg".to_owned(), [false, false, true, false]),
                ("empty.jpg".to_owned(), [false; 4]),
            ]
        );
    }

    #[test]
    fn test_label_dir_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = GroundTruthTable::from_label_dir(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_probabilities_from_detections() {
        let images = vec![
            (
                "a.jpg",
                vec![
                    Detection { class_id: 0, confidence: 0.6 },
                    Detection { class_id: 0, confidence: 0.8 },
                    Detection { class_id: 3, confidence: 0.5 },
                    Detection { class_id: 9, confidence: 0.99 },
                ],
            ),
            ("b.jpg", vec![]),
        ];
        let t = ProbabilityTable::from_detections(images);
        assert_eq!(t.len(), 2);
        let a = t.rows()[0].1;
        assert!((a[0] - 0.7).abs() < 1e-12);
        assert_eq!(&a[1..], &[0.0, 0.0, 0.5]);
        assert_eq!(t.rows()[1].1, [0.0; 4]);
    }
}
