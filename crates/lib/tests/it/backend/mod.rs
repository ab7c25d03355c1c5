mod queries;
mod save_load;
mod writes;
