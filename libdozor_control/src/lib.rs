//! # dozor_control
//!
//! dozor_control drives the dozor diffraction image analysis program over large image
//! sequences, written in Rust. It splits a data collection into batches of contiguous
//! images, writes the `dozor.dat` command file for every batch, runs dozor, and decodes
//! its log into per image quality records (spot counts, scores, visible resolution).
//!
//! ## Installation
//!
//! The only method of install is from source.
//!
//! ### Rust
//!
//! If you have not used Rust before, you will most likely need to install the Rust tool
//! chain. See the [Rust docs](https://www.rust-lang.org/tools/install) for installation
//! instructions.
//!
//! ### dozor
//!
//! dozor itself is not part of this repository. It must be installed together with the
//! image reading libraries it loads (one for CBF images, one for HDF5 containers). Their
//! paths are given in the `site` section of the configuration.
//!
//! ### Building & Install
//!
//! To build and install the CLI use `cargo install --path ./dozor_control_cli` from the
//! top level repository. The binary is installed to your cargo install location
//! (typically something like `~/.cargo/bin/`).
//!
//! ## Configuration
//!
//! A template configuration can be made with `dozor_control_cli new -p config.yml`. The
//! YAML format of a configuration file is as follows:
//!
//! ```yml
//! image_source: !template
//!   directory: /data/visit/raw
//!   template: insulin_1_####.cbf
//!   start_number: 1
//!   end_number: 3600
//! working_path: /data/visit/process/dozor
//! batch_size: null
//! overlap: 0.0
//! beamline: id23eh1
//! spot_size: null
//! spot_level: null
//! wedge_number: null
//! radiation_damage: false
//! mesh: false
//! on_cluster: false
//! return_spot_list: false
//! data_collection_id: null
//! executor:
//!   executable: dozor
//!   cluster: null
//! site:
//!   libraries:
//!     cbf: /opt/dozor/lib/xds-zcbf.so
//!     hdf5: /opt/dozor/lib/dectris-neggia.so
//!     cluster_cbf: null
//!     cluster_hdf5: null
//!   bad_zona: null
//!   beamlines: {}
//! header: null
//! ```
//!
//! - image_source: one of `!images` (explicit list of image paths), `!template` (a
//! directory, a template with a run of `#` or `?` for the image number and an inclusive
//! range) or `!catalog` (a data collection record with a printf style template).
//! - batch_size: maximum images per dozor run. Defaults to the catalog image count, or
//! 5000, and is never more than 5000.
//! - overlap: angular overlap between consecutive images. Any non-zero value runs every
//! image on its own.
//! - mesh: run dozor in mesh mode and collect its `*.all` results into `dozor_all` files.
//! - return_spot_list: attach the table of every image's `NNNNN.spot` file to its record.
//! - data_collection_id: when set, a CSV summary and a gnuplot script are written to the
//! working path.
//! - header: the experimental conditions used for every image when no header reader is
//! available.
//! - site.beamlines: per beamline overrides of the detector bad region and geometry.
//!
//! ## Output
//!
//! Every batch runs in its own directory `<first>_<last>` below the working path, holding
//! `dozor.dat`, `dozor.log`, the per image `NNNNN.spot` files and, in radiation damage
//! mode, `dozor_rd.mtv`. In mesh mode each batch directory and the working path get a
//! `dozor_all` file. The CLI writes the decoded records to `dozor_results.yml` and a
//! log file `dozor_control.log` in the current directory.
pub mod batch;
pub mod config;
pub mod decoder;
pub mod detector;
pub mod encoder;
pub mod error;
pub mod execution;
pub mod header;
pub mod image_set;
pub mod mesh;
pub mod orchestrator;
pub mod params;
pub mod plot;
pub mod process;
pub mod site;
pub mod spot_file;
pub mod summary;
pub mod worker_status;
