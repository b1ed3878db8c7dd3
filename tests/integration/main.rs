mod error_handling;
mod fs_abstraction;
mod inotify_real;
mod mock_loop;
