// ============================================================
// Layer 4 — Dataset Bundle Loader
// ============================================================
// Fetches the pre-split synthetic dataset and turns it into a
// GenomicDataset.
//
// A bundle is a container of named arrays, either an HDF5 file
// (the published datasets) or a NumPy .npz archive:
//
//   X_train  Y_train  X_valid  Y_valid  X_test  Y_test  [model_test]
//
// The container format is sniffed from the leading magic bytes,
// never from the file extension.
//
// Sequence arrays (and model_test) are stored channels-first,
// [samples, 4, positions], and are transposed to channels-last,
// [samples, positions, 4], on load.
//
// Failure policy:
//   - a non-2xx HTTP status aborts immediately (no retry)
//   - a missing array, a channel axis that is not 4, or labels
//     whose row count differs from the sequences abort with a
//     DatasetError
//
// Reference: ndarray-npy documentation (NpzReader)
//            hdf5-metno documentation (File, Container::read_raw)
//            reqwest documentation (blocking client)

use std::{
    fs,
    io::{Cursor, Read, Seek, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use ndarray::{Array2, Array3, ArrayD, Axis, Dimension, IxDyn, OwnedRepr};
use ndarray_npy::NpzReader;
use thiserror::Error;

use crate::domain::genomic::{GenomicDataset, Split};
use crate::domain::traits::DatasetSource;

/// One-hot nucleotide channels
pub const NUM_CHANNELS: usize = 4;

const HDF5_MAGIC: &[u8] = b"\x89HDF\r\n\x1a\n";
const ZIP_MAGIC:  &[u8] = b"PK\x03\x04";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("array '{0}' not found in dataset bundle")]
    MissingArray(String),

    #[error("array '{name}' has {found} channels after transposing, expected 4")]
    BadChannels { name: String, found: usize },

    #[error("array '{name}' has {found} axes, expected {expected}")]
    BadRank { name: String, expected: usize, found: usize },

    #[error("split '{split}' has {sequences} sequences but {labels} label rows")]
    RowMismatch { split: String, sequences: usize, labels: usize },

    #[error("model_test shape {found:?} does not match X_test shape {expected:?}")]
    GroundTruthShape { expected: Vec<usize>, found: Vec<usize> },

    #[error("dataset bundle is neither an HDF5 file nor a .npz archive")]
    UnknownFormat,
}

/// Container format of a bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleFormat {
    Hdf5,
    Npz,
}

impl BundleFormat {
    pub fn sniff(header: &[u8]) -> Result<Self, DatasetError> {
        if header.starts_with(HDF5_MAGIC) {
            Ok(Self::Hdf5)
        } else if header.starts_with(ZIP_MAGIC) {
            Ok(Self::Npz)
        } else {
            Err(DatasetError::UnknownFormat)
        }
    }
}

/// Where the bundle lives
#[derive(Debug, Clone, PartialEq)]
pub enum BundleLocation {
    Url(String),
    File(PathBuf),
}

impl BundleLocation {
    /// Anything that looks like an http(s) URL is downloaded,
    /// everything else is read from disk.
    pub fn parse(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            Self::Url(s.to_string())
        } else {
            Self::File(PathBuf::from(s))
        }
    }
}

/// Loads a GenomicDataset from an HDF5 or .npz bundle.
/// Implements the DatasetSource trait from Layer 3.
pub struct BundleSource {
    location: BundleLocation,
}

impl BundleSource {
    pub fn new(location: BundleLocation) -> Self {
        Self { location }
    }
}

impl DatasetSource for BundleSource {
    fn load(&self) -> Result<GenomicDataset> {
        let dataset = match &self.location {
            BundleLocation::Url(url)   => decode_bytes(fetch(url)?)?,
            BundleLocation::File(path) => decode_file(path)?,
        };
        tracing::info!(
            "Loaded dataset: {} train, {} valid, {} test, {} positions, {} classes{}",
            dataset.train.len(),
            dataset.valid.len(),
            dataset.test.len(),
            dataset.seq_len(),
            dataset.num_classes(),
            if dataset.ground_truth.is_some() { " (with ground truth)" } else { "" },
        );
        Ok(dataset)
    }
}

/// Blocking GET. Any non-success status is an error.
fn fetch(url: &str) -> Result<Vec<u8>> {
    tracing::info!("Downloading dataset bundle from {}", url);
    let response = reqwest::blocking::get(url)
        .with_context(|| format!("Request to '{url}' failed"))?
        .error_for_status()
        .with_context(|| format!("Dataset endpoint '{url}' returned an error status"))?;
    let bytes = response
        .bytes()
        .with_context(|| format!("Cannot read response body from '{url}'"))?;
    tracing::info!("Dataset bundle: {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

/// Decode a bundle held in memory. The HDF5 library only opens
/// files, so an HDF5 download is spooled to a temporary file first.
pub fn decode_bytes(bytes: Vec<u8>) -> Result<GenomicDataset> {
    match BundleFormat::sniff(&bytes)? {
        BundleFormat::Npz  => decode_npz(Cursor::new(bytes)),
        BundleFormat::Hdf5 => {
            let mut spool = tempfile::NamedTempFile::new()
                .context("Cannot create a temporary file for the HDF5 bundle")?;
            spool.write_all(&bytes).context("Cannot spool the HDF5 bundle")?;
            spool.flush()?;
            decode_hdf5(spool.path())
        }
    }
}

/// Decode a bundle on disk.
pub fn decode_file(path: &Path) -> Result<GenomicDataset> {
    let mut header = [0u8; 8];
    let read = fs::File::open(path)
        .and_then(|mut f| f.read(&mut header))
        .with_context(|| format!("Cannot read dataset bundle '{}'", path.display()))?;

    match BundleFormat::sniff(&header[..read])? {
        BundleFormat::Hdf5 => decode_hdf5(path),
        BundleFormat::Npz  => {
            let bytes = fs::read(path)
                .with_context(|| format!("Cannot read dataset bundle '{}'", path.display()))?;
            decode_npz(Cursor::new(bytes))
        }
    }
}

/// Decode a .npz archive into the three splits (+ optional ground truth).
pub fn decode_npz<R: Read + Seek>(reader: R) -> Result<GenomicDataset> {
    let mut store = NpzStore::open(reader)?;
    decode_store(&mut store)
}

/// Decode an HDF5 file whose arrays sit at the root group.
pub fn decode_hdf5(path: &Path) -> Result<GenomicDataset> {
    let mut store = Hdf5Store::open(path)?;
    decode_store(&mut store)
}

// ─── Array stores ────────────────────────────────────────────────────────────

/// A container of named numeric arrays, read back as f32.
trait ArrayStore {
    fn names(&self) -> &[String];
    fn read(&mut self, entry: &str) -> Result<ArrayD<f32>>;
}

struct NpzStore<R: Read + Seek> {
    npz:   NpzReader<R>,
    names: Vec<String>,
}

impl<R: Read + Seek> NpzStore<R> {
    fn open(reader: R) -> Result<Self> {
        let mut npz = NpzReader::new(reader).context("Dataset bundle is not a valid .npz archive")?;
        let names = npz.names().context("Cannot list arrays in dataset bundle")?;
        Ok(Self { npz, names })
    }
}

impl<R: Read + Seek> ArrayStore for NpzStore<R> {
    fn names(&self) -> &[String] {
        &self.names
    }

    /// Datasets ship as float32, float64 or integer arrays depending on
    /// how they were exported; everything is converted to f32.
    fn read(&mut self, entry: &str) -> Result<ArrayD<f32>> {
        let npz = &mut self.npz;
        if let Ok(a) = npz.by_name::<OwnedRepr<f32>, IxDyn>(entry) {
            return Ok(a);
        }
        if let Ok(a) = npz.by_name::<OwnedRepr<f64>, IxDyn>(entry) {
            return Ok(a.mapv(|v| v as f32));
        }
        if let Ok(a) = npz.by_name::<OwnedRepr<i64>, IxDyn>(entry) {
            return Ok(a.mapv(|v| v as f32));
        }
        if let Ok(a) = npz.by_name::<OwnedRepr<i32>, IxDyn>(entry) {
            return Ok(a.mapv(|v| v as f32));
        }
        let a = npz
            .by_name::<OwnedRepr<u8>, IxDyn>(entry)
            .with_context(|| format!("Unsupported dtype for '{entry}'"))?;
        Ok(a.mapv(f32::from))
    }
}

struct Hdf5Store {
    file:  hdf5::File,
    names: Vec<String>,
}

impl Hdf5Store {
    fn open(path: &Path) -> Result<Self> {
        let file = hdf5::File::open(path)
            .with_context(|| format!("'{}' is not a readable HDF5 file", path.display()))?;
        let names = file.member_names().context("Cannot list arrays in dataset bundle")?;
        Ok(Self { file, names })
    }
}

impl ArrayStore for Hdf5Store {
    fn names(&self) -> &[String] {
        &self.names
    }

    /// HDF5 converts integer and float64 storage to f32 on read.
    fn read(&mut self, entry: &str) -> Result<ArrayD<f32>> {
        let ds    = self.file.dataset(entry)?;
        let shape = ds.shape();
        let raw   = ds.read_raw::<f32>().with_context(|| format!("Unsupported dtype for '{entry}'"))?;
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), raw)?)
    }
}

// ─── Decoding ────────────────────────────────────────────────────────────────

fn decode_store(store: &mut dyn ArrayStore) -> Result<GenomicDataset> {
    let train = read_split(store, "train")?;
    let valid = read_split(store, "valid")?;
    let test  = read_split(store, "test")?;

    let ground_truth = match resolve(store.names(), "model_test") {
        Some(entry) => {
            let gt = read_sequences(store, &entry, "model_test")?;
            let expected = test.sequences().shape().to_vec();
            if gt.shape() != expected.as_slice() {
                return Err(DatasetError::GroundTruthShape {
                    expected,
                    found: gt.shape().to_vec(),
                }
                .into());
            }
            Some(gt)
        }
        None => None,
    };

    Ok(GenomicDataset { train, valid, test, ground_truth })
}

fn read_split(store: &mut dyn ArrayStore, split: &str) -> Result<Split> {
    let x_name = format!("X_{split}");
    let y_name = format!("Y_{split}");
    let x_entry = resolve(store.names(), &x_name).ok_or_else(|| DatasetError::MissingArray(x_name.clone()))?;
    let y_entry = resolve(store.names(), &y_name).ok_or_else(|| DatasetError::MissingArray(y_name.clone()))?;

    let sequences = read_sequences(store, &x_entry, &x_name)?;
    let labels: Array2<f32> = with_rank(
        store.read(&y_entry).with_context(|| format!("Cannot read '{y_name}'"))?,
        &y_name,
    )?;

    let (n_seq, n_lab) = (sequences.len_of(Axis(0)), labels.len_of(Axis(0)));
    Split::new(sequences, labels).ok_or_else(|| {
        DatasetError::RowMismatch {
            split:     split.to_string(),
            sequences: n_seq,
            labels:    n_lab,
        }
        .into()
    })
}

/// Read a channels-first sequence array and return it channels-last.
fn read_sequences(store: &mut dyn ArrayStore, entry: &str, name: &str) -> Result<Array3<f32>> {
    let raw: Array3<f32> = with_rank(
        store.read(entry).with_context(|| format!("Cannot read '{name}'"))?,
        name,
    )?;
    let x = raw.permuted_axes([0, 2, 1]).as_standard_layout().into_owned();
    let channels = x.len_of(Axis(2));
    if channels != NUM_CHANNELS {
        return Err(DatasetError::BadChannels { name: name.to_string(), found: channels }.into());
    }
    Ok(x)
}

fn with_rank<D: Dimension>(a: ArrayD<f32>, name: &str) -> Result<ndarray::Array<f32, D>> {
    let found = a.ndim();
    a.into_dimensionality::<D>().map_err(|_| {
        DatasetError::BadRank {
            name:     name.to_string(),
            expected: D::NDIM.unwrap_or(found),
            found,
        }
        .into()
    })
}

/// np.savez stores entries as "<name>.npy"; accept either spelling.
fn resolve(names: &[String], key: &str) -> Option<String> {
    let with_ext = format!("{key}.npy");
    names.iter().find(|n| *n == key || **n == with_ext).cloned()
}
