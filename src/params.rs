use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use indexmap::IndexMap;
use ndarray::Array2;

use crate::error::{NetworkError, SnapshotError};

/// Named parameter tensors of a network, in layer order.
pub type ParamDict = IndexMap<String, Array2<f64>>;

/// Polyak blend `tau * policy + (1 - tau) * target` over two dictionaries
/// with the same keys and shapes.
pub fn soft_update(
    policy: &ParamDict,
    target: &ParamDict,
    tau: f64,
) -> Result<ParamDict, NetworkError> {
    if policy.len() != target.len() {
        return Err(NetworkError::ParameterCount {
            expected: target.len(),
            found: policy.len(),
        });
    }
    policy
        .iter()
        .map(|(name, p)| match target.get(name) {
            Some(t) if t.shape() == p.shape() => {
                Ok((name.clone(), p * tau + &(t * (1.0 - tau))))
            }
            _ => Err(NetworkError::ParameterMismatch(name.clone())),
        })
        .collect()
}

/// Clamps every gradient element to `[-clip_value, clip_value]`.
pub fn clip_grad_value(grads: &mut ParamDict, clip_value: f64) {
    for grad in grads.values_mut() {
        grad.mapv_inplace(|g| g.clamp(-clip_value, clip_value));
    }
}

pub fn save_snapshot(params: &ParamDict, path: &Path) -> Result<(), SnapshotError> {
    let io_error = |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
    serde_json::to_writer(&mut writer, params).map_err(|source| SnapshotError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_error)
}

pub fn load_snapshot(path: &Path) -> Result<ParamDict, SnapshotError> {
    let file = File::open(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| SnapshotError::Format {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn dict(entries: &[(&str, Array2<f64>)]) -> ParamDict {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn soft_update_blends_elementwise() {
        let policy = dict(&[("w", arr2(&[[1.0, 2.0]])), ("b", arr2(&[[4.0]]))]);
        let target = dict(&[("w", arr2(&[[3.0, 0.0]])), ("b", arr2(&[[0.0]]))]);
        let blended = soft_update(&policy, &target, 0.25).unwrap();
        assert_eq!(blended["w"], arr2(&[[2.5, 0.5]]));
        assert_eq!(blended["b"], arr2(&[[1.0]]));
        // inputs are not aliased
        assert_eq!(target["w"], arr2(&[[3.0, 0.0]]));
    }

    #[test]
    fn full_tau_copies_policy() {
        let policy = dict(&[("w", arr2(&[[0.1, -0.7]]))]);
        let target = dict(&[("w", arr2(&[[5.0, 9.0]]))]);
        assert_eq!(soft_update(&policy, &target, 1.0).unwrap(), policy);
    }

    #[test]
    fn soft_update_rejects_structural_mismatch() {
        let policy = dict(&[("w", arr2(&[[1.0]]))]);
        let other_key = dict(&[("v", arr2(&[[1.0]]))]);
        let other_shape = dict(&[("w", arr2(&[[1.0, 1.0]]))]);
        assert!(soft_update(&policy, &other_key, 0.5).is_err());
        assert!(soft_update(&policy, &other_shape, 0.5).is_err());
        assert!(soft_update(&policy, &ParamDict::new(), 0.5).is_err());
    }

    #[test]
    fn clip_bounds_each_element() {
        let mut grads = dict(&[("w", arr2(&[[250.0, -101.0, 3.0]]))]);
        clip_grad_value(&mut grads, 100.0);
        assert_eq!(grads["w"], arr2(&[[100.0, -100.0, 3.0]]));
    }

    #[test]
    fn snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("epoch_1.json");
        let params = dict(&[("layers.0.weight", arr2(&[[0.5, -0.25]])), ("layers.0.bias", arr2(&[[1.0]]))]);
        save_snapshot(&params, &path).unwrap();
        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded, params);
        assert_eq!(loaded.keys().collect::<Vec<_>>(), params.keys().collect::<Vec<_>>());
    }

    #[test]
    fn loading_garbage_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(load_snapshot(&path), Err(SnapshotError::Format { .. })));
        assert!(matches!(
            load_snapshot(&dir.path().join("missing.json")),
            Err(SnapshotError::Io { .. })
        ));
    }
}
