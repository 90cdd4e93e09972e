// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::gainmap::GainMap;
use crate::gainmap::GainMapMetadata;
use crate::image::*;
use crate::internal_utils::*;
use crate::*;

pub const MAX_GRID_DIMENSION: u32 = 256;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Grid {
    pub rows: u32,
    pub columns: u32,
    // Dimensions of the assembled image.
    pub width: u32,
    pub height: u32,
}

impl Grid {
    pub fn cell_count(&self) -> AvifResult<u32> {
        checked_mul!(self.rows, self.columns)
    }

    pub fn cell_width(&self) -> u32 {
        if self.columns == 0 {
            0
        } else {
            self.width / self.columns
        }
    }

    pub fn cell_height(&self) -> u32 {
        if self.rows == 0 {
            0
        } else {
            self.height / self.rows
        }
    }
}

/// Checks that |cells| describe a |columns| x |rows| grid of identically shaped cells, in row
/// major order. Returns the geometry of the assembled image.
pub fn validate(cells: &[ImageDescriptor], columns: u32, rows: u32) -> AvifResult<Grid> {
    if columns == 0 || rows == 0 {
        return AvifError::invalid_image_grid(format!("invalid grid size {columns}x{rows}"));
    }
    if columns > MAX_GRID_DIMENSION || rows > MAX_GRID_DIMENSION {
        return AvifError::invalid_image_grid(format!(
            "grid size {columns}x{rows} exceeds {MAX_GRID_DIMENSION}x{MAX_GRID_DIMENSION}"
        ));
    }
    let cell_count = usize_from_u32(checked_mul!(columns, rows)?)?;
    if cells.len() != cell_count {
        return AvifError::invalid_image_grid(format!(
            "expected {cell_count} cells for a {columns}x{rows} grid, got {}",
            cells.len()
        ));
    }
    let first = &cells[0];
    if first.width == 0 || first.height == 0 {
        return AvifError::invalid_image_grid("cell 0: empty cell");
    }
    if !matches!(first.depth, 8 | 10 | 12 | 16) {
        return AvifError::invalid_image_grid(format!("cell 0: unsupported depth {}", first.depth));
    }
    if first.yuv_format == PixelFormat::None {
        return AvifError::invalid_image_grid("cell 0: no pixel format");
    }
    // Subsampled chroma planes of neighboring cells must not share a sample.
    if columns > 1 && first.yuv_format.chroma_shift_x() == 1 && first.width % 2 != 0 {
        return AvifError::invalid_image_grid(format!(
            "cell 0: width {} is odd with subsampled chroma",
            first.width
        ));
    }
    if rows > 1 && first.yuv_format.chroma_shift_y() == 1 && first.height % 2 != 0 {
        return AvifError::invalid_image_grid(format!(
            "cell 0: height {} is odd with subsampled chroma",
            first.height
        ));
    }
    for (index, cell) in cells.iter().enumerate().skip(1) {
        if cell.width != first.width {
            return AvifError::invalid_image_grid(format!(
                "cell {index}: width {} does not match {}",
                cell.width, first.width
            ));
        }
        if cell.height != first.height {
            return AvifError::invalid_image_grid(format!(
                "cell {index}: height {} does not match {}",
                cell.height, first.height
            ));
        }
        if cell.depth != first.depth {
            return AvifError::invalid_image_grid(format!(
                "cell {index}: depth {} does not match {}",
                cell.depth, first.depth
            ));
        }
        if cell.yuv_format != first.yuv_format {
            return AvifError::invalid_image_grid(format!(
                "cell {index}: pixel format {:?} does not match {:?}",
                cell.yuv_format, first.yuv_format
            ));
        }
    }
    let grid = Grid {
        rows,
        columns,
        width: checked_mul!(columns, first.width)?,
        height: checked_mul!(rows, first.height)?,
    };
    log::trace!(
        "grid {columns}x{rows} of {}x{} cells: {}x{}",
        first.width,
        first.height,
        grid.width,
        grid.height
    );
    Ok(grid)
}

/// Gain map metadata describes the whole logical image, so every cell must carry the same values.
pub fn validate_gainmap_metadata(metadata: &[&GainMapMetadata]) -> AvifResult<()> {
    let Some(first) = metadata.first() else {
        return Ok(());
    };
    for (index, cell_metadata) in metadata.iter().enumerate().skip(1) {
        if cell_metadata != first {
            return AvifError::invalid_image_grid(format!(
                "cell {index}: gain map metadata does not match cell 0"
            ));
        }
    }
    Ok(())
}

/// Concatenates the planes of |cells| into one image. Gain maps owned by the cells are ignored,
/// see validate_and_assemble_grid() to assemble them as well.
pub fn assemble(cells: &[&Image], columns: u32, rows: u32) -> AvifResult<Image> {
    let descriptors: Vec<ImageDescriptor> = cells.iter().map(|cell| cell.descriptor()).collect();
    let grid = validate(&descriptors, columns, rows)?;
    validate_cell_planes(cells)?;
    assemble_validated(cells, &grid)
}

// Every cell must own color samples, and either all cells or none of them carry alpha.
fn validate_cell_planes(cells: &[&Image]) -> AvifResult<()> {
    let with_alpha = cells[0].has_alpha();
    for (index, cell) in cells.iter().enumerate() {
        if !cell.has_plane(Plane::Y) {
            return AvifError::invalid_image_grid(format!("cell {index}: no pixels"));
        }
        if cell.has_alpha() != with_alpha {
            return AvifError::invalid_image_grid(format!(
                "cell {index}: alpha presence does not match cell 0"
            ));
        }
    }
    Ok(())
}

fn assemble_validated(cells: &[&Image], grid: &Grid) -> AvifResult<Image> {
    let first = cells[0];
    let mut image = first.shallow_clone();
    image.width = grid.width;
    image.height = grid.height;
    image.alpha_present = false;
    image.allocate_planes(Category::Color)?;
    let with_alpha = first.has_alpha();
    if with_alpha {
        image.allocate_planes(Category::Alpha)?;
    }
    for (index, cell) in cells.iter().enumerate() {
        let index = u32_from_usize(index)?;
        image.copy_from_tile(cell, grid, index, Category::Color)?;
        if with_alpha {
            image.copy_from_tile(cell, grid, index, Category::Alpha)?;
        }
    }
    Ok(image)
}

/// Validates |cells| as a |columns| x |rows| grid without touching any sample. Returns the
/// geometry of the assembled image and, when the cells own gain map pixels, the geometry of the
/// assembled gain map image. The gain map images use the same cell layout as the cells and the
/// gain map metadata must be identical in every cell.
pub fn validate_cells(
    cells: &[&Image],
    columns: u32,
    rows: u32,
) -> AvifResult<(Grid, Option<Grid>)> {
    let descriptors: Vec<ImageDescriptor> = cells.iter().map(|cell| cell.descriptor()).collect();
    let grid = validate(&descriptors, columns, rows)?;
    let first = cells[0];
    for (index, cell) in cells.iter().enumerate().skip(1) {
        if cell.gainmap.is_some() != first.gainmap.is_some() {
            return AvifError::invalid_image_grid(format!(
                "cell {index}: gain map presence does not match cell 0"
            ));
        }
    }
    validate_cell_planes(cells)?;
    let gainmaps: Vec<&GainMap> = cells
        .iter()
        .filter_map(|cell| cell.gainmap.as_deref())
        .collect();
    if gainmaps.is_empty() {
        return Ok((grid, None));
    }
    let metadata: Vec<&GainMapMetadata> = gainmaps.iter().map(|x| &x.metadata).collect();
    validate_gainmap_metadata(&metadata)?;
    let images: Vec<&Image> = gainmaps.iter().filter_map(|x| x.image.as_ref()).collect();
    if images.is_empty() {
        return Ok((grid, None));
    }
    if images.len() != gainmaps.len() {
        return AvifError::invalid_image_grid("some cells have gain map pixels and some do not");
    }
    let descriptors: Vec<ImageDescriptor> = images.iter().map(|image| image.descriptor()).collect();
    let gainmap_grid = validate(&descriptors, columns, rows).map_err(|err| match err {
        AvifError::InvalidImageGrid(message) => {
            AvifError::InvalidImageGrid(format!("gain map {message}"))
        }
        err => err,
    })?;
    Ok((grid, Some(gainmap_grid)))
}

/// Validates |cells| as a |columns| x |rows| grid and assembles them into one image. Works for
/// base images and gain map images alike. Cells owning gain maps get their gain map images
/// assembled as a grid of their own, see validate_cells().
pub fn validate_and_assemble_grid(cells: &[&Image], columns: u32, rows: u32) -> AvifResult<Image> {
    let (grid, gainmap_grid) = validate_cells(cells, columns, rows)?;
    let mut image = assemble_validated(cells, &grid)?;
    if let Some(first) = cells[0].gainmap.as_deref() {
        let mut gainmap = first.shallow_clone();
        if let Some(gainmap_grid) = gainmap_grid {
            let images: Vec<&Image> = cells
                .iter()
                .filter_map(|cell| cell.gainmap.as_ref().and_then(|x| x.image.as_ref()))
                .collect();
            gainmap.image = Some(assemble_validated(&images, &gainmap_grid)?);
        }
        image.gainmap = Some(Box::new(gainmap));
    }
    Ok(image)
}
