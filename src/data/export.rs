//! Writes preparation artifacts: the baseline table, window tensors and splits.

use crate::data::error::PrepError;
use crate::data::features::FeatureMatrix;
use crate::data::windows::WindowTensors;
use crate::types::record::ConsumptionRecord;
use async_compression::tokio::bufread::GzipDecoder;
use async_compression::tokio::write::GzipEncoder;
use bincode::config::{Configuration, Fixint, LittleEndian};
use log::info;
use polars::prelude::*;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::{fs, task};

const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

const INTEGER_FEATURES: [&str; 3] = ["hour", "dayofweek", "is_weekend"];

/// Converts the baseline matrix to a frame with a naive-UTC millisecond
/// `timestamp`, `consumption`, then every feature column in build order.
pub fn feature_frame(matrix: &FeatureMatrix) -> Result<DataFrame, PrepError> {
    let millis: Vec<i64> = matrix
        .timestamps()
        .iter()
        .map(|t| t.timestamp_millis())
        .collect();
    let timestamp = Series::new("timestamp".into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;

    let mut columns: Vec<Column> = vec![
        timestamp.into(),
        Column::new("consumption".into(), matrix.targets()),
    ];
    for name in matrix.feature_columns() {
        let values = matrix.column(name).unwrap_or_default();
        let series = Series::new(name.as_str().into(), values);
        let series = if INTEGER_FEATURES.contains(&name.as_str()) {
            series.cast(&DataType::Int32)?
        } else {
            series
        };
        columns.push(series.into());
    }
    Ok(DataFrame::new(columns)?)
}

/// Converts records to a frame whose `timestamp` column holds RFC 3339
/// strings, so a written CSV loads back through the consumption loader.
pub fn records_frame(records: &[ConsumptionRecord]) -> Result<DataFrame, PrepError> {
    let timestamps: Vec<String> = records.iter().map(|r| r.timestamp.to_rfc3339()).collect();
    let consumption: Vec<f64> = records.iter().map(|r| r.consumption).collect();
    Ok(DataFrame::new(vec![
        Column::new("timestamp".into(), timestamps),
        Column::new("consumption".into(), consumption),
    ])?)
}

/// Writes a frame to a Snappy-compressed parquet file on a blocking thread.
pub async fn write_parquet(mut df: DataFrame, path: &Path) -> Result<(), PrepError> {
    ensure_parent(path).await?;
    let path_buf = path.to_path_buf();
    task::spawn_blocking(move || {
        let file = std::fs::File::create(&path_buf)
            .map_err(|e| PrepError::Io(path_buf.clone(), e))?;
        ParquetWriter::new(file)
            .with_compression(ParquetCompression::Snappy)
            .finish(&mut df)
            .map_err(|e| PrepError::ParquetWrite(path_buf.clone(), e))?;
        info!("Saved dataframe to {}", path_buf.display());
        Ok::<(), PrepError>(())
    })
    .await??;
    Ok(())
}

/// Writes a frame to CSV with a header row on a blocking thread.
pub async fn write_csv(mut df: DataFrame, path: &Path) -> Result<(), PrepError> {
    ensure_parent(path).await?;
    let path_buf = path.to_path_buf();
    task::spawn_blocking(move || {
        let mut file = std::fs::File::create(&path_buf)
            .map_err(|e| PrepError::Io(path_buf.clone(), e))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)
            .map_err(|e| PrepError::CsvWrite(path_buf.clone(), e))?;
        info!("Saved dataframe to {}", path_buf.display());
        Ok::<(), PrepError>(())
    })
    .await??;
    Ok(())
}

/// Stores window tensors as gzip-compressed bincode.
pub async fn save_windows(tensors: &WindowTensors, path: &Path) -> Result<(), PrepError> {
    ensure_parent(path).await?;
    let bytes = bincode::serde::encode_to_vec(tensors, BINCODE_CONFIG)
        .map_err(|e| PrepError::TensorEncode(Box::new(e)))?;

    let file = fs::File::create(path)
        .await
        .map_err(|e| PrepError::Io(path.to_path_buf(), e))?;
    let mut encoder = GzipEncoder::new(file);
    encoder
        .write_all(&bytes)
        .await
        .map_err(|e| PrepError::Io(path.to_path_buf(), e))?;
    encoder
        .shutdown()
        .await
        .map_err(|e| PrepError::Io(path.to_path_buf(), e))?;
    info!(
        "Saved {} window samples ({} bytes before compression) to {}",
        tensors.n_samples(),
        bytes.len(),
        path.display()
    );
    Ok(())
}

pub async fn load_windows(path: &Path) -> Result<WindowTensors, PrepError> {
    let file = fs::File::open(path)
        .await
        .map_err(|e| PrepError::Io(path.to_path_buf(), e))?;
    let mut decoder = GzipDecoder::new(BufReader::new(file));
    let mut bytes = Vec::new();
    decoder
        .read_to_end(&mut bytes)
        .await
        .map_err(|e| PrepError::Io(path.to_path_buf(), e))?;

    let (tensors, _) = bincode::serde::decode_from_slice::<WindowTensors, _>(&bytes, BINCODE_CONFIG)
        .map_err(|e| PrepError::TensorDecode(path.to_path_buf(), Box::new(e)))?;
    Ok(tensors)
}

async fn ensure_parent(path: &Path) -> Result<(), PrepError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .await
            .map_err(|e| PrepError::Io(parent.to_path_buf(), e)),
        _ => Ok(()),
    }
}
