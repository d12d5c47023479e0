mod board;
mod context_menu;
mod dialogs;
mod options_panel;
mod overlay;
mod toast;
