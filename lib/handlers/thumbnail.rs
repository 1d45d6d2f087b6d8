//! Thumbnail handler.

use std::path::Path;

use crate::error::LaunchResult;
use crate::thumbnail::thumbnail_data_url;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Print an image file as a data URL.
pub async fn print_thumbnail(path: &Path) -> LaunchResult<()> {
    let url = thumbnail_data_url(path).await?;
    println!("{}", url);
    Ok(())
}
