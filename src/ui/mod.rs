pub mod board_viewer;
