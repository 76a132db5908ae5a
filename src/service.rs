use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::config::{Config, OutputFormat};
use crate::errors::{RepositoryError, ServiceError};
use crate::parser::{parse_command, RideCommand};
use crate::repository::RideRepository;
use crate::ride::{Ride, RideId};

const NOT_FOUND: &str = "(0,0,0)";
const NO_ACTIVE_RIDES: &str = "No active ride requests";
const DUPLICATE_RIDE: &str = "Duplicate RideNumber";

/// Executes ride commands against a repository and writes each result line
/// to `out`.
pub struct RideService<W: Write> {
    repo: RideRepository,
    out: W,
    format: OutputFormat,
}

impl<W: Write> RideService<W> {
    pub fn new(repo: RideRepository, out: W, format: OutputFormat) -> Self {
        Self { repo, out, format }
    }

    pub fn repository(&self) -> &RideRepository {
        &self.repo
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Processes every line of `input` and returns how many commands ran.
    ///
    /// A duplicate ride number stops processing: the remaining lines are not
    /// read and the fatal error is returned once the output is flushed.
    #[instrument(skip_all)]
    pub fn run<R: BufRead>(&mut self, input: R) -> Result<usize, ServiceError> {
        let mut processed = 0;
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Err(err) = self.process_cmd(&line) {
                self.out.flush()?;
                return Err(err);
            }
            processed += 1;
        }

        self.out.flush()?;
        info!(processed, pending = self.repo.len(), "input exhausted");
        Ok(processed)
    }

    pub fn process_cmd(&mut self, line: &str) -> Result<(), ServiceError> {
        let command = parse_command(line)
            .map(|(_, command)| command)
            .unwrap_or(RideCommand::Unknown(line));

        match command {
            RideCommand::Insert(ride_id, cost, duration) => {
                match self.repo.insert(ride_id, cost, duration) {
                    Ok(()) => Ok(()),
                    Err(RepositoryError::DuplicateRide(ride_id)) => {
                        error!(ride_id, "duplicate ride number, halting");
                        self.write_duplicate(ride_id)?;
                        Err(ServiceError::DuplicateRide(ride_id))
                    }
                    Err(err) => {
                        warn!(ride_id, %err, "ride dropped");
                        Ok(())
                    }
                }
            }
            RideCommand::Print(ride_id) => {
                let ride = self.repo.find(ride_id);
                self.write_ride(ride.as_ref())
            }
            RideCommand::PrintRange(low, high) => {
                let rides = self.repo.find_range(low, high);
                self.write_rides(&rides)
            }
            RideCommand::GetNextRide => match self.repo.next_ride() {
                Some(ride) => self.write_ride(Some(&ride)),
                None => self.write_no_active_rides(),
            },
            RideCommand::CancelRide(ride_id) => {
                self.repo.cancel(ride_id);
                Ok(())
            }
            RideCommand::UpdateTrip(ride_id, duration) => {
                self.repo.update(ride_id, duration);
                Ok(())
            }
            RideCommand::Unknown(text) => {
                warn!(command = text, "skipping unrecognized command");
                Ok(())
            }
        }
    }

    fn write_ride(&mut self, ride: Option<&Ride>) -> Result<(), ServiceError> {
        match self.format {
            OutputFormat::Triplet => match ride {
                Some(ride) => writeln!(self.out, "{}", format_triplet(ride))?,
                None => writeln!(self.out, "{NOT_FOUND}")?,
            },
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, &ride)?;
                writeln!(self.out)?;
            }
        }
        Ok(())
    }

    fn write_rides(&mut self, rides: &[Ride]) -> Result<(), ServiceError> {
        match self.format {
            OutputFormat::Triplet if rides.is_empty() => writeln!(self.out, "{NOT_FOUND}")?,
            OutputFormat::Triplet => {
                let line = rides.iter().map(format_triplet).collect::<Vec<_>>().join(",");
                writeln!(self.out, "{line}")?;
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, rides)?;
                writeln!(self.out)?;
            }
        }
        Ok(())
    }

    fn write_no_active_rides(&mut self) -> Result<(), ServiceError> {
        match self.format {
            OutputFormat::Triplet => writeln!(self.out, "{NO_ACTIVE_RIDES}")?,
            OutputFormat::Json => writeln!(self.out, "null")?,
        }
        Ok(())
    }

    fn write_duplicate(&mut self, ride_id: RideId) -> Result<(), ServiceError> {
        match self.format {
            OutputFormat::Triplet => writeln!(self.out, "{DUPLICATE_RIDE}")?,
            OutputFormat::Json => {
                let line = json!({ "error": "duplicate_ride", "ride_id": ride_id });
                writeln!(self.out, "{line}")?;
            }
        }
        Ok(())
    }
}

pub fn format_triplet(ride: &Ride) -> String {
    format!("({},{},{})", ride.ride_id, ride.cost, ride.duration)
}

/// Runs the command file at `input`, writing results to `config.output`.
pub fn run_files(config: &Config, input: &Path) -> Result<usize, ServiceError> {
    let reader = BufReader::new(File::open(input)?);
    let writer = BufWriter::new(File::create(&config.output)?);

    info!(input = %input.display(), output = %config.output.display(), capacity = config.capacity, "processing commands");
    let mut service = RideService::new(RideRepository::new(config.capacity), writer, config.format);
    service.run(reader)
}
