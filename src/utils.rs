use crate::engine::{Tile, GRID_SIZE};

/// Parses an array of string slices into the tiles of a board.
///
/// Each string slice in the input array represents a row on the board, starting from row 0.
/// A row holds up to `GRID_SIZE` whitespace-separated cells; each cell is either a tile
/// value (a power of two, at least 2) or `.` for an empty cell. Missing rows and missing
/// trailing cells are empty.
///
/// Tiles get ids `1, 2, 3, ...` in row-major order and have their transient flags cleared.
///
/// # Arguments
/// * `s`: A slice of string slices (`&[&str]`) representing the rows of the board.
///
/// # Returns
/// * `Ok(Vec<Tile>)` with one tile per non-empty cell, in row-major order.
/// * `Err(String)` if:
///     - The number of rows in `s` exceeds `GRID_SIZE`.
///     - Any row holds more than `GRID_SIZE` cells.
///     - A cell is neither `.` nor a power of two of at least 2.
///
/// # Examples
/// ```
/// use slide_tiles::utils::tiles_from_str_array;
///
/// let tiles = tiles_from_str_array(&[
///     "2 . . 4",
///     ". 16",
/// ]).unwrap();
/// assert_eq!(tiles.len(), 3);
/// assert_eq!((tiles[1].row, tiles[1].col, tiles[1].value), (0, 3, 4));
/// assert_eq!((tiles[2].row, tiles[2].col, tiles[2].value), (1, 1, 16));
///
/// assert!(tiles_from_str_array(&["3 . . ."]).is_err());
/// assert!(tiles_from_str_array(&["2 2 2 2 2"]).is_err());
/// ```
pub fn tiles_from_str_array(s: &[&str]) -> Result<Vec<Tile>, String> {
    if s.len() > GRID_SIZE {
        return Err(format!(
            "Invalid number of rows. Expected at most {}, found {}",
            GRID_SIZE,
            s.len()
        ));
    }

    let mut tiles = Vec::new();
    for (r, row_str) in s.iter().enumerate() {
        let cells: Vec<&str> = row_str.split_whitespace().collect();
        if cells.len() > GRID_SIZE {
            return Err(format!(
                "Row {} is too long. Expected at most {} cells, found {}",
                r,
                GRID_SIZE,
                cells.len()
            ));
        }

        for (c, cell) in cells.iter().enumerate() {
            if *cell == "." {
                continue;
            }
            let value = match cell.parse::<u32>() {
                Ok(v) if v >= 2 && v.is_power_of_two() => v,
                _ => {
                    return Err(format!(
                        "Unrecognized cell '{}' in row {} col {}",
                        cell, r, c
                    ))
                }
            };
            let id = tiles.len() as u64 + 1;
            tiles.push(Tile::new(id, value, r, c));
        }
    }
    Ok(tiles)
}
