//! JSON coefficient dataset format
//!
//! ```text
//! {
//!   "sites": [[lon, lat, depth], ...],             // null for unknown
//!   "atlantic_arctic": [true, false, ...],          // optional
//!   "coefficients": [                                // one entry per site
//!     [[c0, cS, cθ, cN, cAOU, cSi], ... 16 equations],
//!     ...
//!   ],
//!   "model_error": {
//!     "salinity": [s0, s1, ...],
//!     "errors": [[e1, ..., e16], ...]                // one row per salinity
//!   }
//! }
//! ```
//!
//! JSON has no NaN; coefficients that were not fitted and unknown site
//! coordinates are written as `null`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::dataset::{CoefficientDataset, ModelErrorTable};
use crate::error::{Error, Result};
use crate::params::{Equation, CHANNEL_COUNT, EQUATION_COUNT};

#[derive(Debug, Serialize, Deserialize)]
struct DatasetFile {
    sites: Vec<[Option<f64>; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    atlantic_arctic: Option<Vec<bool>>,
    coefficients: Vec<Vec<[Option<f64>; CHANNEL_COUNT]>>,
    model_error: ModelErrorFile,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelErrorFile {
    salinity: Vec<f64>,
    errors: Vec<[f64; EQUATION_COUNT]>,
}

/// Read a coefficient dataset from a JSON file.
///
/// Any failure (missing file, malformed JSON, inconsistent shapes) is
/// reported as [`Error::DatasetUnavailable`].
pub fn read_dataset<P: AsRef<Path>>(path: P) -> Result<CoefficientDataset> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| Error::DatasetUnavailable(format!("cannot open {}: {}", path.display(), e)))?;
    let raw: DatasetFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| Error::DatasetUnavailable(format!("cannot parse {}: {}", path.display(), e)))?;

    let dataset = from_file(raw)?;
    tracing::debug!(path = %path.display(), sites = dataset.len(), "loaded coefficient dataset");
    Ok(dataset)
}

/// Read a coefficient dataset from an in-memory JSON buffer.
pub fn read_dataset_from_buffer(data: &[u8]) -> Result<CoefficientDataset> {
    let raw: DatasetFile = serde_json::from_slice(data)
        .map_err(|e| Error::DatasetUnavailable(format!("cannot parse dataset: {e}")))?;
    from_file(raw)
}

/// Write a coefficient dataset as JSON.
pub fn write_dataset<P: AsRef<Path>>(dataset: &CoefficientDataset, path: P) -> Result<()> {
    let path = path.as_ref();
    let failed = |reason: String| Error::InvalidParameter {
        name: "path",
        value: path.display().to_string(),
        reason,
    };

    let file = File::create(path).map_err(|e| failed(e.to_string()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &to_file(dataset)).map_err(|e| failed(e.to_string()))?;
    writer.flush().map_err(|e| failed(e.to_string()))
}

/// Serialize a coefficient dataset to a JSON buffer.
pub fn write_dataset_to_buffer(dataset: &CoefficientDataset) -> Result<Vec<u8>> {
    serde_json::to_vec(&to_file(dataset)).map_err(|e| Error::InvalidParameter {
        name: "dataset",
        value: format!("{} sites", dataset.len()),
        reason: e.to_string(),
    })
}

fn from_file(raw: DatasetFile) -> Result<CoefficientDataset> {
    let n = raw.sites.len();
    if raw.coefficients.len() != n {
        return Err(Error::DatasetUnavailable(format!(
            "{} sites but {} coefficient entries",
            n,
            raw.coefficients.len()
        )));
    }

    let sites = Array2::from_shape_fn((n, 3), |(i, j)| raw.sites[i][j].unwrap_or(f64::NAN));

    let mut coefficients = Array3::from_elem((n, EQUATION_COUNT, CHANNEL_COUNT), f64::NAN);
    for (i, per_site) in raw.coefficients.iter().enumerate() {
        if per_site.len() != EQUATION_COUNT {
            return Err(Error::DatasetUnavailable(format!(
                "site {} has {} equations, expected {}",
                i,
                per_site.len(),
                EQUATION_COUNT
            )));
        }
        for (e, channels) in per_site.iter().enumerate() {
            for (c, value) in channels.iter().enumerate() {
                coefficients[[i, e, c]] = value.unwrap_or(f64::NAN);
            }
        }
    }

    let m = raw.model_error.errors.len();
    let errors = Array2::from_shape_fn((m, EQUATION_COUNT), |(i, e)| raw.model_error.errors[i][e]);
    let model_error = ModelErrorTable::new(raw.model_error.salinity, errors).map_err(unavailable)?;

    let dataset = CoefficientDataset::new(sites, coefficients, model_error).map_err(unavailable)?;
    match raw.atlantic_arctic {
        Some(flags) => dataset.with_region_flags(flags).map_err(unavailable),
        None => Ok(dataset),
    }
}

fn to_file(dataset: &CoefficientDataset) -> DatasetFile {
    let sites: Vec<[Option<f64>; 3]> = dataset
        .sites()
        .rows()
        .into_iter()
        .map(|r| std::array::from_fn(|j| Some(r[j]).filter(|v| v.is_finite())))
        .collect();

    let all = dataset.coefficients();
    let coefficients: Vec<Vec<[Option<f64>; CHANNEL_COUNT]>> = (0..dataset.len())
        .map(|i| {
            Equation::all()
                .map(|eq| std::array::from_fn(|c| Some(all[[i, eq.index(), c]]).filter(|v| v.is_finite())))
                .collect::<Vec<_>>()
        })
        .collect();

    let table = dataset.model_error();
    let errors: Vec<[f64; EQUATION_COUNT]> = table
        .errors()
        .rows()
        .into_iter()
        .map(|r| std::array::from_fn(|e| r[e]))
        .collect();

    DatasetFile {
        sites,
        atlantic_arctic: dataset.region_flags().map(<[bool]>::to_vec),
        coefficients,
        model_error: ModelErrorFile {
            salinity: table.salinity().to_vec(),
            errors,
        },
    }
}

fn unavailable(e: Error) -> Error {
    Error::DatasetUnavailable(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::NamedTempFile;

    fn sample() -> CoefficientDataset {
        let sites = Array2::from_shape_vec((2, 3), vec![330.0, 30.0, 0.0, 200.0, -10.0, 1000.0]).unwrap();
        let mut coefficients = Array3::from_shape_fn((2, EQUATION_COUNT, CHANNEL_COUNT), |(i, e, c)| {
            (i * 100 + e * 10 + c) as f64
        });
        coefficients[[1, 15, 5]] = f64::NAN;
        let table = ModelErrorTable::new(vec![30.0, 40.0], Array2::from_elem((2, EQUATION_COUNT), 4.0)).unwrap();
        CoefficientDataset::new(sites, coefficients, table)
            .unwrap()
            .with_region_flags(vec![true, false])
            .unwrap()
    }

    #[test]
    fn test_file_roundtrip() {
        let ds = sample();
        let tmp = NamedTempFile::new().unwrap();
        write_dataset(&ds, tmp.path()).unwrap();

        let back = read_dataset(tmp.path()).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.region_flags(), Some(&[true, false][..]));
        assert_relative_eq!(back.coefficients()[[1, 2, 3]], 123.0);
        assert!(back.coefficients()[[1, 15, 5]].is_nan());
        assert_relative_eq!(back.sites()[[1, 2]], 1000.0);
    }

    #[test]
    fn test_unknown_site_coordinate_roundtrip() {
        let ds = sample();
        let mut sites = ds.sites().to_owned();
        sites[[0, 2]] = f64::NAN;
        let ds = CoefficientDataset::new(sites, ds.coefficients().clone(), ds.model_error().clone()).unwrap();

        let bytes = write_dataset_to_buffer(&ds).unwrap();
        let back = read_dataset_from_buffer(&bytes).unwrap();
        assert!(back.sites()[[0, 2]].is_nan());
        assert_relative_eq!(back.sites()[[0, 0]], 330.0);
    }

    #[test]
    fn test_failed_write_is_reported() {
        // Every write to /dev/full fails with ENOSPC, including the final flush
        let full = Path::new("/dev/full");
        if !full.exists() {
            return;
        }
        assert!(matches!(
            write_dataset(&sample(), full),
            Err(Error::InvalidParameter { name: "path", .. })
        ));
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let err = read_dataset("/nonexistent/lira/coefficients.json").unwrap_err();
        assert!(matches!(err, Error::DatasetUnavailable(_)));
    }

    #[test]
    fn test_malformed_buffer_is_unavailable() {
        assert!(matches!(
            read_dataset_from_buffer(b"{\"sites\": 3}"),
            Err(Error::DatasetUnavailable(_))
        ));
    }

    #[test]
    fn test_inconsistent_shapes_are_unavailable() {
        let json = br#"{
            "sites": [[0.0, 0.0, 0.0]],
            "coefficients": [],
            "model_error": {"salinity": [35.0], "errors": [[1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1]]}
        }"#;
        assert!(matches!(read_dataset_from_buffer(json), Err(Error::DatasetUnavailable(_))));
    }

    #[test]
    fn test_buffer_without_region_flags() {
        let ds = sample();
        let unflagged =
            CoefficientDataset::new(ds.sites().to_owned(), ds.coefficients().clone(), ds.model_error().clone())
                .unwrap();
        let bytes = write_dataset_to_buffer(&unflagged).unwrap();
        let back = read_dataset_from_buffer(&bytes).unwrap();
        assert!(back.region_flags().is_none());
        assert_eq!(back.model_error().salinity(), &[30.0, 40.0]);
    }
}
