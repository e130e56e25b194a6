/// Generates the default `config.toml` contents with explanatory comments.
///
/// This is used by `spotter init` to create a starter config file that
/// users can immediately edit.
pub fn generate_config() -> String {
    r##"# Spotter configuration
# Location: ~/.config/spotter/config.toml

[target]
# Executable name of the process to watch, e.g. "game.exe".
process_name = ""
# Capture only the client area (true) or the whole window with borders.
client_area = true
# Windows smaller than this are not captured.
min_width = 100
min_height = 100

[matching]
# Image to look for (PNG, JPEG or BMP).
template = ""
# "template" (correlation), "feature" (keypoints) or "multi_scale".
method = "template"
# Minimum confidence for a match (0.0 to 1.0).
threshold = 0.8
# Scale range searched by "multi_scale" (5 evenly spaced samples).
min_scale = 0.8
max_scale = 1.2
# Reserved: rotation is not searched and at most one match is reported.
rotation_tolerance = 5.0
max_matches = 1

[preprocessing]
grayscale = true
# Compare Canny edge maps instead of intensities.
edge_detection = false
# Gaussian blur kernel applied to frames (0 disables, even sizes round up).
blur_kernel = 0
# 0 derives sigma from the kernel size.
blur_sigma = 0.0

[trigger]
enabled = true
# Minimum time between two triggers (0 to 10000).
cooldown_ms = 1000
# How often the window is checked.
tick_ms = 100
# Playback cap in seconds; -1 plays in full (max 300).
duration = -1.0
# Command run on every trigger; "{duration}" is replaced by the cap.
# Leave empty to only log triggers.
# command = ["ffplay", "-nodisp", "-autoexit", "-t", "{duration}", "alert.wav"]
command = []

[debug]
# Verbose logging.
enabled = false
# Write the annotated frame here after every match:
# save_path = "C:/temp/spotter-debug.png"

[logging]
# Enable file logging to ~/.config/spotter/logs/spotter.log.
enabled = false
# Minimum log level: "trace", "debug", "info", "warn", or "error".
level = "info"
# Maximum log file size in MB before rotation.
max_file_mb = 10
"##
    .to_string()
}
