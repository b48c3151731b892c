//! Runtime Capability Detection
//!
//! Probes the machine once per session (CPU count, physical memory,
//! hardware encoder availability, a short synthetic benchmark) and folds
//! the results into a single performance score the engine selector
//! branches on. Probing is behind a trait so tests inject fixed values.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::encoder::EncoderInstallation;
use crate::process::configure_tokio_command;

// =============================================================================
// Hardware acceleration
// =============================================================================

/// Hardware encoder family exposed through FFmpeg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareAccel {
    /// NVIDIA NVENC
    Nvenc,
    /// AMD VCE/VCN
    Amf,
    /// Intel QuickSync
    Qsv,
    /// Apple VideoToolbox
    VideoToolbox,
    /// VAAPI (Linux)
    Vaapi,
}

impl HardwareAccel {
    /// FFmpeg encoder name for H.264
    pub fn h264_encoder(&self) -> &'static str {
        match self {
            HardwareAccel::Nvenc => "h264_nvenc",
            HardwareAccel::Amf => "h264_amf",
            HardwareAccel::Qsv => "h264_qsv",
            HardwareAccel::VideoToolbox => "h264_videotoolbox",
            HardwareAccel::Vaapi => "h264_vaapi",
        }
    }

    /// All families, in preference order
    pub fn all() -> [HardwareAccel; 5] {
        [
            HardwareAccel::Nvenc,
            HardwareAccel::VideoToolbox,
            HardwareAccel::Qsv,
            HardwareAccel::Amf,
            HardwareAccel::Vaapi,
        ]
    }
}

// =============================================================================
// Capability snapshot
// =============================================================================

/// Probed runtime capabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeCapabilities {
    /// True when an FFmpeg binary was detected on this machine
    pub encoder_available: bool,
    /// Logical CPU count
    pub cpu_count: usize,
    /// Total physical memory in MB (None when unreadable)
    pub total_memory_mb: Option<u64>,
    /// Hardware encoder families FFmpeg reports as usable
    pub hardware_accels: Vec<HardwareAccel>,
    /// Major version of the detected FFmpeg binary
    pub encoder_version_major: Option<u32>,
    /// Synthetic benchmark duration in milliseconds (lower is faster)
    pub benchmark_ms: f64,
    /// Aggregate performance score (0-100)
    pub performance_score: u8,
}

impl RuntimeCapabilities {
    pub fn has_hardware_encoder(&self) -> bool {
        !self.hardware_accels.is_empty()
    }

    /// Preferred hardware family, respecting the preference order
    pub fn best_hardware_accel(&self) -> Option<HardwareAccel> {
        HardwareAccel::all()
            .into_iter()
            .find(|a| self.hardware_accels.contains(a))
    }

    pub fn memory_gb(&self) -> Option<f64> {
        self.total_memory_mb.map(|mb| mb as f64 / 1024.0)
    }
}

/// Fold raw probe results into a 0-100 score.
///
/// Component caps: concurrency 30, memory 25, benchmark 30, modern
/// encoder features 15. Unknown memory contributes a conservative
/// mid-range value rather than zero.
pub fn performance_score(
    cpu_count: usize,
    total_memory_mb: Option<u64>,
    benchmark_ms: f64,
    has_hardware_encoder: bool,
    encoder_version_major: Option<u32>,
) -> u8 {
    let concurrency = (cpu_count as f64 * 4.0).min(30.0);

    let memory = match total_memory_mb {
        Some(mb) => ((mb as f64 / 1024.0) / 16.0 * 25.0).min(25.0),
        None => 12.0,
    };

    let benchmark = ((50.0 - benchmark_ms) / 45.0 * 30.0).clamp(0.0, 30.0);

    let mut modern = 0.0;
    if has_hardware_encoder {
        modern += 10.0;
    }
    if encoder_version_major.map(|v| v >= 6).unwrap_or(false) {
        modern += 5.0;
    }

    (concurrency + memory + benchmark + modern).round().min(100.0) as u8
}

// =============================================================================
// Probes
// =============================================================================

/// Raw measurement source for capability detection
#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    fn encoder_available(&self) -> bool;
    fn cpu_count(&self) -> usize;
    fn total_memory_mb(&self) -> Option<u64>;
    async fn hardware_accels(&self) -> Vec<HardwareAccel>;
    fn encoder_version_major(&self) -> Option<u32>;
    fn benchmark_ms(&self) -> f64;
}

/// Probe backed by the real system and a detected FFmpeg installation
pub struct SystemProbe {
    encoder: Option<EncoderInstallation>,
}

impl SystemProbe {
    pub fn new(encoder: Option<EncoderInstallation>) -> Self {
        Self { encoder }
    }
}

#[async_trait]
impl CapabilityProbe for SystemProbe {
    fn encoder_available(&self) -> bool {
        self.encoder.is_some()
    }

    fn cpu_count(&self) -> usize {
        num_cpus::get()
    }

    fn total_memory_mb(&self) -> Option<u64> {
        read_total_memory_mb()
    }

    async fn hardware_accels(&self) -> Vec<HardwareAccel> {
        let Some(encoder) = &self.encoder else {
            return vec![];
        };

        let mut cmd = tokio::process::Command::new(&encoder.ffmpeg_path);
        configure_tokio_command(&mut cmd);
        let output = match cmd.args(["-hide_banner", "-encoders"]).output().await {
            Ok(o) if o.status.success() => o,
            _ => return vec![],
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        scan_encoder_list(&stdout)
    }

    fn encoder_version_major(&self) -> Option<u32> {
        self.encoder.as_ref().and_then(|e| e.version_major())
    }

    fn benchmark_ms(&self) -> f64 {
        run_synthetic_benchmark()
    }
}

/// Scan `ffmpeg -encoders` output for known hardware encoder names
fn scan_encoder_list(listing: &str) -> Vec<HardwareAccel> {
    HardwareAccel::all()
        .into_iter()
        .filter(|accel| {
            listing
                .lines()
                .any(|line| line.split_whitespace().any(|w| w == accel.h264_encoder()))
        })
        .collect()
}

/// Read total physical memory, platform-specific
fn read_total_memory_mb() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        // /proc/meminfo: "MemTotal:       16384000 kB"
        let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
        let line = meminfo.lines().find(|l| l.starts_with("MemTotal:"))?;
        let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
        Some(kb / 1024)
    }

    #[cfg(target_os = "macos")]
    {
        let mut cmd = std::process::Command::new("sysctl");
        crate::process::configure_std_command(&mut cmd);
        let output = cmd.args(["-n", "hw.memsize"]).output().ok()?;
        let bytes: u64 = String::from_utf8_lossy(&output.stdout).trim().parse().ok()?;
        Some(bytes / (1024 * 1024))
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

/// Small fixed-work compute loop, timed. Scores relative machine speed
/// without touching the disk or the encoder.
fn run_synthetic_benchmark() -> f64 {
    let start = std::time::Instant::now();
    let mut acc = 0.0f64;
    for i in 0..400_000u32 {
        acc += (i as f64).sqrt().sin();
    }
    // Keep the loop from being optimized away.
    std::hint::black_box(acc);
    start.elapsed().as_secs_f64() * 1000.0
}

// =============================================================================
// Context
// =============================================================================

/// Lazily probed, session-cached capability snapshot
pub struct CapabilityContext {
    probe: Arc<dyn CapabilityProbe>,
    cache: RwLock<Option<RuntimeCapabilities>>,
}

impl CapabilityContext {
    pub fn new(probe: Arc<dyn CapabilityProbe>) -> Self {
        Self {
            probe,
            cache: RwLock::new(None),
        }
    }

    /// Returns the cached snapshot, probing on first use.
    pub async fn get(&self) -> RuntimeCapabilities {
        if let Some(caps) = self.cache.read().await.clone() {
            return caps;
        }
        self.refresh().await
    }

    /// Re-probes and replaces the cached snapshot (e.g. after the user
    /// installs FFmpeg mid-session).
    pub async fn refresh(&self) -> RuntimeCapabilities {
        let encoder_available = self.probe.encoder_available();
        let cpu_count = self.probe.cpu_count();
        let total_memory_mb = self.probe.total_memory_mb();
        let hardware_accels = self.probe.hardware_accels().await;
        let encoder_version_major = self.probe.encoder_version_major();
        let benchmark_ms = self.probe.benchmark_ms();

        let score = performance_score(
            cpu_count,
            total_memory_mb,
            benchmark_ms,
            !hardware_accels.is_empty(),
            encoder_version_major,
        );

        let caps = RuntimeCapabilities {
            encoder_available,
            cpu_count,
            total_memory_mb,
            hardware_accels,
            encoder_version_major,
            benchmark_ms,
            performance_score: score,
        };

        info!(
            "Probed runtime capabilities: {} CPUs, {:?} MB memory, hw accels {:?}, score {}",
            caps.cpu_count, caps.total_memory_mb, caps.hardware_accels, caps.performance_score
        );
        debug!("Synthetic benchmark: {:.2} ms", caps.benchmark_ms);

        *self.cache.write().await = Some(caps.clone());
        caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProbe {
        cpu: usize,
        memory_mb: Option<u64>,
        accels: Vec<HardwareAccel>,
        version: Option<u32>,
        bench_ms: f64,
        probes: AtomicUsize,
    }

    impl FixedProbe {
        fn fast_desktop() -> Self {
            Self {
                cpu: 12,
                memory_mb: Some(32 * 1024),
                accels: vec![HardwareAccel::Nvenc],
                version: Some(7),
                bench_ms: 4.0,
                probes: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CapabilityProbe for FixedProbe {
        fn encoder_available(&self) -> bool {
            self.version.is_some()
        }
        fn cpu_count(&self) -> usize {
            self.cpu
        }
        fn total_memory_mb(&self) -> Option<u64> {
            self.memory_mb
        }
        async fn hardware_accels(&self) -> Vec<HardwareAccel> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.accels.clone()
        }
        fn encoder_version_major(&self) -> Option<u32> {
            self.version
        }
        fn benchmark_ms(&self) -> f64 {
            self.bench_ms
        }
    }

    #[test]
    fn test_score_caps_components() {
        // Strong machine maxes every component.
        assert_eq!(performance_score(16, Some(64 * 1024), 1.0, true, Some(7)), 100);
        // Weak machine bottoms out above zero (concurrency floor).
        let low = performance_score(1, Some(1024), 80.0, false, None);
        assert!(low < 40, "low-end score was {}", low);
    }

    #[test]
    fn test_score_unknown_memory_is_conservative() {
        let unknown = performance_score(8, None, 10.0, false, None);
        let known_high = performance_score(8, Some(32 * 1024), 10.0, false, None);
        let known_low = performance_score(8, Some(2 * 1024), 10.0, false, None);
        assert!(unknown < known_high);
        assert!(unknown > known_low);
    }

    #[test]
    fn test_scan_encoder_list() {
        let listing = "\
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC
 V....D h264_nvenc           NVIDIA NVENC H.264 encoder
 V....D h264_vaapi           H.264/AVC (VAAPI)";
        let accels = scan_encoder_list(listing);
        assert!(accels.contains(&HardwareAccel::Nvenc));
        assert!(accels.contains(&HardwareAccel::Vaapi));
        assert!(!accels.contains(&HardwareAccel::Qsv));
    }

    #[test]
    fn test_best_hardware_accel_prefers_nvenc() {
        let caps = RuntimeCapabilities {
            encoder_available: true,
            cpu_count: 8,
            total_memory_mb: Some(16 * 1024),
            hardware_accels: vec![HardwareAccel::Vaapi, HardwareAccel::Nvenc],
            encoder_version_major: Some(7),
            benchmark_ms: 5.0,
            performance_score: 90,
        };
        assert_eq!(caps.best_hardware_accel(), Some(HardwareAccel::Nvenc));
    }

    #[tokio::test]
    async fn test_context_caches_until_refresh() {
        let probe = Arc::new(FixedProbe::fast_desktop());
        let context = CapabilityContext::new(probe.clone());

        let first = context.get().await;
        let second = context.get().await;
        assert_eq!(first, second);
        assert_eq!(probe.probes.load(Ordering::SeqCst), 1);

        context.refresh().await;
        assert_eq!(probe.probes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_context_scores_fast_desktop_high() {
        let context = CapabilityContext::new(Arc::new(FixedProbe::fast_desktop()));
        let caps = context.get().await;
        assert!(caps.performance_score >= 70);
        assert!(caps.has_hardware_encoder());
    }

    #[test]
    fn test_synthetic_benchmark_returns_positive() {
        assert!(run_synthetic_benchmark() > 0.0);
    }
}
