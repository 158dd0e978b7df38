//! Named subtests run against a built [`Topology`].

use core::fmt;

use crate::blend::BlendSweep;
use crate::device::ModesetDevice;
use crate::report::enumeration_report;
use crate::result::Fault;
use crate::topology::Topology;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subtest {
    EnumerationReport,
    BlendSweep,
}

/// Why a subtest failed.
#[derive(Debug)]
pub enum SubtestError {
    Fault(Fault),
    Output(fmt::Error),
}

impl From<Fault> for SubtestError {
    fn from(value: Fault) -> Self {
        Self::Fault(value)
    }
}

impl From<fmt::Error> for SubtestError {
    fn from(value: fmt::Error) -> Self {
        Self::Output(value)
    }
}

impl fmt::Display for SubtestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubtestError::Fault(e) => e.fmt(f),
            SubtestError::Output(_) => f.write_str("failed to write report"),
        }
    }
}

impl core::error::Error for SubtestError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            SubtestError::Fault(e) => Some(e),
            SubtestError::Output(e) => Some(e),
        }
    }
}

impl Subtest {
    /// Every subtest, in the order they run by default.
    pub const ALL: &'static [Self] = &[Self::EnumerationReport, Self::BlendSweep];

    pub const fn name(self) -> &'static str {
        match self {
            Self::EnumerationReport => "enumeration-report",
            Self::BlendSweep => "blend-sweep",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    pub fn run<D, W>(self, topology: &Topology<'_, D>, out: &mut W) -> Result<(), SubtestError>
    where
        D: ModesetDevice + ?Sized,
        W: fmt::Write + ?Sized,
    {
        match self {
            Self::EnumerationReport => enumeration_report(topology, out)?,
            Self::BlendSweep => {
                let summary = BlendSweep::default().run(topology)?;
                writeln!(
                    out,
                    "{} property writes, {} framebuffers attached",
                    summary.property_writes, summary.attaches
                )?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Subtest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
