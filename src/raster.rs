//! Loading grids from CSV rasters
//!
//! A raster has no header and one line per grid row. Each field is an integer
//! cell code read with [`Cell::from_code`]. The first line is the northernmost
//! row, so a file reads like a map with `y` growing upwards.

use std::{io, path::Path};

use crate::{
    env::{Cell, GridEnvironment},
    error::{Error, Result},
};

/// Build a grid from any CSV source
pub fn from_reader<R: io::Read>(reader: R) -> Result<GridEnvironment> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);
    parse(reader)
}

/// Build a grid from a CSV file
pub fn from_path<P: AsRef<Path>>(path: P) -> Result<GridEnvironment> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)?;
    parse(reader)
}

fn parse<R: io::Read>(mut reader: csv::Reader<R>) -> Result<GridEnvironment> {
    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let row = record
            .iter()
            .enumerate()
            .map(|(column, field)| {
                field.parse::<i64>().map(Cell::from_code).map_err(|_| {
                    Error::Raster(format!(
                        "cell `{field}` at line {}, column {} is not an integer",
                        line + 1,
                        column + 1
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }

    let height = rows.len();
    let width = rows.first().map_or(0, Vec::len);
    if width == 0 {
        return Err(Error::Raster(String::from("raster is empty")));
    }

    // north first in the file, y = 0 first in the grid
    let cells = rows.into_iter().rev().flatten().collect();
    GridEnvironment::from_cells(dim(width)?, dim(height)?, cells)
}

fn dim(n: usize) -> Result<i32> {
    i32::try_from(n).map_err(|_| Error::Raster(format!("dimension {n} is too large")))
}
