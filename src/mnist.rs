use flate2::read::GzDecoder;
use itertools::Itertools;
use log::info;
use ndarray::{Array1, ArrayView1};
use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

pub const IMAGE_MAGIC: u32 = 2051;
pub const LABEL_MAGIC: u32 = 2049;
pub const CLASSES: usize = 10;

// File names of the training set, with both the hyphenated and dotted spellings in circulation.
const TRAINING_IMAGES: [&str; 2] = ["train-images-idx3-ubyte", "train-images.idx3-ubyte"];
const TRAINING_LABELS: [&str; 2] = ["train-labels-idx1-ubyte", "train-labels.idx1-ubyte"];

#[derive(thiserror::Error, Debug)]
pub enum MnistError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no dataset file named {name} (optionally .gz) in {dir}")]
    MissingFile { dir: PathBuf, name: String },

    #[error("bad magic number: expected {expected}, found {found}")]
    BadMagic { expected: u32, found: u32 },

    #[error("file is truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("bad image dimensions {rows}x{columns}")]
    BadDimensions { rows: u32, columns: u32 },

    #[error("{images} images but {labels} labels")]
    CountMismatch { images: usize, labels: usize },

    #[error("label {0} is not a digit")]
    LabelOutOfRange(u8),
}

// A single handwritten digit. The expected_output is the perfect activation of the output layer
// for this digit: 1.0 for the neuron of the correct answer and 0.0 everywhere else.
#[derive(Debug, Clone)]
pub struct MnistDatum {
    pub input: Array1<f64>,
    pub expected_output: Array1<f64>,
    pub expected_answer: u8,
}

#[derive(Debug)]
pub struct MnistData {
    pub rows: usize,
    pub columns: usize,
    pub data: Vec<MnistDatum>,
}

impl MnistData {
    // Loads the training images and labels from `dir`. Each file may be stored raw or gzipped.
    pub fn load(dir: impl AsRef<Path>) -> Result<MnistData, MnistError> {
        let dir = dir.as_ref();
        let image_bytes = read_bytes(&find_file(dir, &TRAINING_IMAGES)?)?;
        let label_bytes = read_bytes(&find_file(dir, &TRAINING_LABELS)?)?;

        let data = MnistData::from_bytes(&image_bytes, &label_bytes)?;
        info!(
            "loaded {} digits of {}x{} pixels from {}",
            data.data.len(),
            data.rows,
            data.columns,
            dir.display()
        );
        Ok(data)
    }

    // Pairs up an image file and a label file that have already been read into memory.
    pub fn from_bytes(image_bytes: &[u8], label_bytes: &[u8]) -> Result<MnistData, MnistError> {
        let (images, rows, columns) = parse_images(image_bytes)?;
        let labels = parse_labels(label_bytes)?;

        if images.len() != labels.len() {
            return Err(MnistError::CountMismatch {
                images: images.len(),
                labels: labels.len(),
            });
        }

        let data = images
            .into_iter()
            .zip(labels)
            .map(|(input, expected_answer)| MnistDatum {
                input,
                expected_output: one_hot(expected_answer),
                expected_answer,
            })
            .collect();

        Ok(MnistData {
            rows,
            columns,
            data,
        })
    }
}

// Looks for any of `names` in `dir`, raw first and then gzipped.
fn find_file(dir: &Path, names: &[&str]) -> Result<PathBuf, MnistError> {
    names
        .iter()
        .flat_map(|name| [dir.join(name), dir.join(format!("{name}.gz"))])
        .find(|path| path.is_file())
        .ok_or_else(|| MnistError::MissingFile {
            dir: dir.to_path_buf(),
            name: names[0].to_string(),
        })
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, MnistError> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    if path.extension().is_some_and(|extension| extension == "gz") {
        GzDecoder::new(file).read_to_end(&mut bytes)?;
    } else {
        file.read_to_end(&mut bytes)?;
    }
    Ok(bytes)
}

// Reads `words` big-endian 32-bit integers from the start of `bytes`, checking the first one
// against `magic`.
fn read_header(bytes: &[u8], words: usize, magic: u32) -> Result<Vec<u32>, MnistError> {
    let length = words * 4;
    if bytes.len() < length {
        return Err(MnistError::Truncated {
            expected: length,
            found: bytes.len(),
        });
    }

    let header = bytes[..length]
        .chunks_exact(4)
        .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect::<Vec<_>>();

    if header[0] != magic {
        return Err(MnistError::BadMagic {
            expected: magic,
            found: header[0],
        });
    }
    Ok(header)
}

// Decodes an image file: a header of four big-endian integers (magic number 2051, image count,
// rows, columns) followed by one byte per pixel. Pixels are scaled from 0..=255 to [0, 1].
//
// Returns the images along with their row and column counts.
pub fn parse_images(bytes: &[u8]) -> Result<(Vec<Array1<f64>>, usize, usize), MnistError> {
    let header = read_header(bytes, 4, IMAGE_MAGIC)?;
    let (count, rows, columns) = (header[1] as usize, header[2], header[3]);

    let pixels = (rows as usize)
        .checked_mul(columns as usize)
        .filter(|&pixels| pixels > 0)
        .ok_or(MnistError::BadDimensions { rows, columns })?;
    let body = &bytes[16..];
    let expected = count
        .checked_mul(pixels)
        .ok_or(MnistError::BadDimensions { rows, columns })?;
    let file_len = expected
        .checked_add(16)
        .ok_or(MnistError::BadDimensions { rows, columns })?;
    if body.len() < expected {
        return Err(MnistError::Truncated {
            expected: file_len,
            found: bytes.len(),
        });
    }

    let images = body[..expected]
        .iter()
        .chunks(pixels)
        .into_iter()
        .map(|chunk| chunk.map(|&value| value as f64 / 255.0).collect::<Array1<f64>>())
        .collect::<Vec<_>>();

    Ok((images, rows as usize, columns as usize))
}

// Decodes a label file: a header of two big-endian integers (magic number 2049, label count)
// followed by one byte per label.
pub fn parse_labels(bytes: &[u8]) -> Result<Vec<u8>, MnistError> {
    let header = read_header(bytes, 2, LABEL_MAGIC)?;
    let count = header[1] as usize;

    let body = &bytes[8..];
    if body.len() < count {
        return Err(MnistError::Truncated {
            expected: count.saturating_add(8),
            found: bytes.len(),
        });
    }

    let labels = &body[..count];
    if let Some(&label) = labels.iter().find(|&&label| label as usize >= CLASSES) {
        return Err(MnistError::LabelOutOfRange(label));
    }
    Ok(labels.to_vec())
}

// A [10] array where every value is 0.0 except for the value in the position corresponding to the
// label, whose value is 1.0.
pub fn one_hot(label: u8) -> Array1<f64> {
    Array1::from_shape_fn(CLASSES, |i| if i == label as usize { 1.0 } else { 0.0 })
}

// A simple ASCII drawing of a digit, `columns` pixels per line, for debugging.
pub fn render(input: ArrayView1<f64>, columns: usize) -> String {
    let mut drawing = String::new();
    for (index, activation) in input.iter().enumerate() {
        if index > 0 && columns > 0 && index % columns == 0 {
            drawing.push('\n');
        }

        drawing.push(match activation {
            a if *a < 0.2 => ' ',
            a if *a < 0.4 => '░',
            a if *a < 0.6 => '▒',
            a if *a < 0.8 => '▓',
            _ => '█',
        });
    }
    drawing
}
